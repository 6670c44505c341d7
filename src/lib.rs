//! rrchunk: fetch a Royal Road fiction's chapter index, cache it with chapter content in SQLite,
//! and compile 10-chapter chunks to escaped text or sanitized HTML.

pub mod cache;
pub mod cli;
pub mod config;
pub mod content;
pub mod document;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod scraper;

// Re-exports for CLI and consumers.
pub use cache::{CacheError, CacheKey, CacheStore, SqliteCache};
pub use content::SanitizeError;
pub use document::{CompiledChapter, CompiledDocument};
pub use error::{Error, Stage};
pub use model::{
    list_chunks, ChapterContent, ChapterDescriptor, ChapterIndex, Chunk, CompileMode, FictionId,
    CHUNK_SIZE,
};
pub use orchestrator::{ChapterProgress, Orchestrator};
pub use scraper::{
    FetchError, HttpFetch, HttpResponse, Pacer, ParseError, PoliteClient, PoliteClientBuilder,
};
