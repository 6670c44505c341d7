//! Orchestrator-level error: lower-layer errors plus the fiction, chunk and chapter they hit.

use crate::cache::CacheError;
use crate::content::SanitizeError;
use crate::model::{ChapterId, FictionId};
use crate::scraper::{FetchError, ParseError};
use thiserror::Error;

/// Pipeline step an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveUrl,
    IndexFetch,
    IndexParse,
    ChunkSelect,
    ChapterFetch,
    ChapterExtract,
    CacheRead,
    CacheWrite,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidFictionUrl(#[source] ParseError),

    #[error("Fiction {fiction}: could not fetch the chapter index: {source}")]
    IndexFetch {
        fiction: FictionId,
        #[source]
        source: FetchError,
    },

    #[error("Fiction {fiction}: could not read the chapter index: {source}")]
    IndexParse {
        fiction: FictionId,
        #[source]
        source: ParseError,
    },

    #[error("Fiction {fiction} has {chunks} chunk(s); chunk {chunk} does not exist.")]
    ChunkOutOfRange {
        fiction: FictionId,
        chunk: usize,
        chunks: usize,
    },

    #[error("Chunk {chunk}, chapter {position} (id {chapter_id}, {title:?}): fetch failed: {source}")]
    ChapterFetch {
        fiction: FictionId,
        chunk: usize,
        /// 1-based position within the chunk.
        position: usize,
        chapter_id: ChapterId,
        title: String,
        #[source]
        source: FetchError,
    },

    #[error("Chunk {chunk}, chapter {position} (id {chapter_id}, {title:?}): {source}")]
    ChapterParse {
        fiction: FictionId,
        chunk: usize,
        position: usize,
        chapter_id: ChapterId,
        title: String,
        #[source]
        source: ParseError,
    },

    #[error("Chunk {chunk}, chapter {position} (id {chapter_id}, {title:?}): {source}")]
    ChapterSanitize {
        fiction: FictionId,
        chunk: usize,
        position: usize,
        chapter_id: ChapterId,
        title: String,
        #[source]
        source: SanitizeError,
    },

    #[error("Cache failure ({key}): {source}")]
    Cache {
        stage: Stage,
        key: String,
        #[source]
        source: CacheError,
    },
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::InvalidFictionUrl(_) => Stage::ResolveUrl,
            Error::IndexFetch { .. } => Stage::IndexFetch,
            Error::IndexParse { .. } => Stage::IndexParse,
            Error::ChunkOutOfRange { .. } => Stage::ChunkSelect,
            Error::ChapterFetch { .. } => Stage::ChapterFetch,
            Error::ChapterParse { .. } | Error::ChapterSanitize { .. } => Stage::ChapterExtract,
            Error::Cache { stage, .. } => *stage,
        }
    }

    /// Chapter the failure belongs to, for chapter-level failures.
    pub fn chapter_id(&self) -> Option<ChapterId> {
        match self {
            Error::ChapterFetch { chapter_id, .. }
            | Error::ChapterParse { chapter_id, .. }
            | Error::ChapterSanitize { chapter_id, .. } => Some(*chapter_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_fetch_error_names_the_chapter() {
        let err = Error::ChapterFetch {
            fiction: FictionId::new(1, Some("s".into())),
            chunk: 0,
            position: 3,
            chapter_id: 103,
            title: "Three".to_string(),
            source: FetchError::HttpStatus {
                status: 503,
                url: "https://www.royalroad.com/x".to_string(),
            },
        };
        assert_eq!(err.stage(), Stage::ChapterFetch);
        assert_eq!(err.chapter_id(), Some(103));
        let msg = err.to_string();
        assert!(msg.contains("chapter 3"));
        assert!(msg.contains("id 103"));
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn index_errors_have_no_chapter() {
        let err = Error::IndexParse {
            fiction: FictionId::new(1, None),
            source: ParseError::ChapterListMissing,
        };
        assert_eq!(err.stage(), Stage::IndexParse);
        assert_eq!(err.chapter_id(), None);
    }
}
