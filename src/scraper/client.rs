//! Blocking HTTP capability: the `HttpFetch` seam and its reqwest implementation.
//!
//! Pacing between calls is not done here; see [`Pacer`](super::Pacer), owned by the orchestrator.

use super::error::FetchError;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; rrchunk/0.1; +https://github.com/rrchunk)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Status and raw body of a completed request. Non-success statuses are returned, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can GET a URL. Implemented by [`PoliteClient`]; tests substitute fakes.
pub trait HttpFetch {
    fn fetch(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// Blocking reqwest client with cookie jar, browser-like User-Agent and a request timeout.
#[derive(Debug, Clone)]
pub struct PoliteClient {
    inner: reqwest::blocking::Client,
}

impl PoliteClient {
    pub fn builder() -> PoliteClientBuilder {
        PoliteClientBuilder::default()
    }
}

impl HttpFetch for PoliteClient {
    fn fetch(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let response = self
            .inner
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Network {
                        url: url.to_string(),
                        source: e,
                    }
                }
            })?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::BodyRead {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Builder for PoliteClient with optional User-Agent and timeout.
#[derive(Debug)]
pub struct PoliteClientBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl Default for PoliteClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PoliteClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<PoliteClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(PoliteClient { inner })
    }
}
