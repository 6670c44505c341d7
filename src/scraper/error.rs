//! Fetch and parse errors raised below the orchestrator. The orchestrator wraps these with
//! fiction/chapter context before they reach a caller.

use crate::model::ChapterId;
use thiserror::Error;

/// Failure reaching the upstream site or reading its response.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// HTTP status when the failure was a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Expected page structure not found or malformed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid fiction URL: {input}: {reason}")]
    InvalidFictionUrl { input: String, reason: String },

    #[error("Could not find window.chapters on the fiction page (format changed, fiction missing, or access blocked).")]
    ChapterListMissing,

    #[error("Could not extract window.chapters array: {reason}")]
    UnbalancedArray { reason: String },

    #[error("Could not parse chapter list: {source}")]
    InvalidChapterList {
        #[source]
        source: serde_json::Error,
    },

    #[error("Chapter list contains duplicate chapter id {id}.")]
    DuplicateChapterId { id: ChapterId },

    #[error("Chapter {id} has an invalid URL {url:?}: {reason}")]
    InvalidChapterUrl {
        id: ChapterId,
        url: String,
        reason: String,
    },

    #[error("Could not find chapter content container on the page.")]
    MissingChapterContent,

    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}
