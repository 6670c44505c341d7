//! Durable key/value cache for chapter indexes and extracted chapter content.
//!
//! Keys are partitioned by kind: one namespace for fiction indexes (keyed by fiction id) and one
//! for chapter content (keyed by chapter id). Entries never expire.

mod sqlite;

pub use sqlite::SqliteCache;

use crate::model::{ChapterId, FictionId};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache connection lock poisoned")]
    Poisoned,
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Logical table a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    FictionIndex,
    ChapterContent,
}

impl Namespace {
    pub fn table(self) -> &'static str {
        match self {
            Namespace::FictionIndex => "fiction_index",
            Namespace::ChapterContent => "chapter_content",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Index(FictionId),
    Content(ChapterId),
}

impl CacheKey {
    pub fn namespace(&self) -> Namespace {
        match self {
            CacheKey::Index(_) => Namespace::FictionIndex,
            CacheKey::Content(_) => Namespace::ChapterContent,
        }
    }

    /// Stable string form stored in the key column. The slug is not part of an index key, so
    /// different spellings of the same fiction URL share one entry.
    pub fn key(&self) -> String {
        match self {
            CacheKey::Index(fiction) => fiction.id.to_string(),
            CacheKey::Content(id) => id.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace().table(), self.key())
    }
}

/// Persistent key/value store. Implementations must be safe to share between threads.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> CacheResult<Option<String>>;

    /// Insert or overwrite (last write wins).
    fn put(&self, key: &CacheKey, value: &str) -> CacheResult<()>;

    fn exists(&self, key: &CacheKey) -> CacheResult<bool>;
}

impl<T: CacheStore + ?Sized> CacheStore for std::sync::Arc<T> {
    fn get(&self, key: &CacheKey) -> CacheResult<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, value: &str) -> CacheResult<()> {
        (**self).put(key, value)
    }

    fn exists(&self, key: &CacheKey) -> CacheResult<bool> {
        (**self).exists(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_key_ignores_slug() {
        let a = CacheKey::Index(FictionId::new(21220, Some("mother-of-learning".into())));
        let b = CacheKey::Index(FictionId::new(21220, None));
        assert_eq!(a.key(), b.key());
        assert_eq!(a.to_string(), "fiction_index:21220");
    }

    #[test]
    fn namespaces_are_distinct() {
        let index = CacheKey::Index(FictionId::new(7, None));
        let content = CacheKey::Content(7);
        assert_eq!(index.key(), content.key());
        assert_ne!(index.namespace(), content.namespace());
    }
}
