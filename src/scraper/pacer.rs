//! Politeness gate: a minimum interval (plus optional random jitter) between consecutive
//! outbound calls.
//!
//! Shared by every request that goes through one orchestrator. `wait` reserves the next call
//! slot under the lock and sleeps outside it; `mark_done` records when the response arrived.
//! The next call starts no earlier than `min_interval` after the later of the previous call's
//! start and its completion, so a slow response does not eat the delay. Separate processes do
//! not coordinate.

use rand::Rng;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    jitter: Duration,
    /// Earliest permitted start of the next call. None before the first call.
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration, jitter: Duration) -> Self {
        Self {
            min_interval,
            jitter,
            next_slot: Mutex::new(None),
        }
    }

    /// No delay between calls.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Block until the next call may start. Returns how long it slept.
    pub fn wait(&self) -> Duration {
        let now = Instant::now();
        let slot = self.reserve(now);
        let delay = slot.saturating_duration_since(now);
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "pacing before request");
            std::thread::sleep(delay);
        }
        delay
    }

    /// Record that the call started by the last `wait` has finished, successfully or not.
    pub fn mark_done(&self) {
        self.complete(Instant::now());
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        // A panic elsewhere while holding the lock leaves a valid Option<Instant>.
        self.next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn gap(&self) -> Duration {
        self.min_interval + self.sample_jitter()
    }

    fn reserve(&self, now: Instant) -> Instant {
        let mut next = self.lock();
        let slot = match *next {
            None => now,
            Some(at) => at.max(now),
        };
        *next = Some(slot + self.gap());
        slot
    }

    fn complete(&self, done: Instant) {
        let mut next = self.lock();
        let after_done = done + self.gap();
        *next = Some(match *next {
            Some(at) => at.max(after_done),
            None => after_done,
        });
    }

    fn sample_jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

impl Default for Pacer {
    /// 2 s minimum interval with up to 2 s jitter.
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(2))
    }
}
