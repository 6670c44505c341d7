//! Fetch orchestrator: the cached index and chunk pipeline.
//!
//! Index resolution: cache hit returns the stored index; a miss fetches the fiction page,
//! parses it, stores it, and returns it. Chunk compilation resolves each chapter from the cache
//! or, on a miss, paces, fetches, extracts and stores it, strictly in order. The first failing
//! chapter aborts the chunk; chapters stored before it stay cached. Only after every chapter is
//! resolved are they compiled and joined.

use crate::cache::{CacheError, CacheKey, CacheStore};
use crate::content::{self, decode_lossy, extract_chapter};
use crate::document::{CompiledChapter, CompiledDocument};
use crate::error::{Error, Stage};
use crate::model::{
    self, ChapterContent, ChapterDescriptor, ChapterIndex, Chunk, CompileMode, FictionId,
};
use crate::scraper::royalroad::{parse_chapter_index, parse_fiction_id};
use crate::scraper::{FetchError, HttpFetch, Pacer};
use tracing::{debug, info, warn};

/// Progress report for one resolved chapter of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterProgress {
    /// 1-based position within the chunk.
    pub position: usize,
    pub total: usize,
    pub chapter_id: model::ChapterId,
    /// True when the content came from the cache (no network call).
    pub cached: bool,
}

/// Where a chapter sits, for error context.
struct ChapterSlot<'a> {
    fiction: &'a FictionId,
    chunk: usize,
    position: usize,
    descriptor: &'a ChapterDescriptor,
}

impl ChapterSlot<'_> {
    fn fetch_error(&self, source: FetchError) -> Error {
        Error::ChapterFetch {
            fiction: self.fiction.clone(),
            chunk: self.chunk,
            position: self.position,
            chapter_id: self.descriptor.id,
            title: self.descriptor.title.clone(),
            source,
        }
    }

    fn parse_error(&self, source: crate::scraper::ParseError) -> Error {
        Error::ChapterParse {
            fiction: self.fiction.clone(),
            chunk: self.chunk,
            position: self.position,
            chapter_id: self.descriptor.id,
            title: self.descriptor.title.clone(),
            source,
        }
    }

    fn sanitize_error(&self, source: content::SanitizeError) -> Error {
        Error::ChapterSanitize {
            fiction: self.fiction.clone(),
            chunk: self.chunk,
            position: self.position,
            chapter_id: self.descriptor.id,
            title: self.descriptor.title.clone(),
            source,
        }
    }
}

fn cache_error(stage: Stage, key: &CacheKey) -> impl FnOnce(CacheError) -> Error + '_ {
    move |source| Error::Cache {
        stage,
        key: key.to_string(),
        source,
    }
}

/// Owns the HTTP capability, the cache and the pacing clock.
///
/// `Sync` when `F` is, so one orchestrator can serve concurrent requests; pacing then applies
/// across all of them.
pub struct Orchestrator<F, C> {
    fetcher: F,
    cache: C,
    pacer: Pacer,
}

impl<F: HttpFetch, C: CacheStore> Orchestrator<F, C> {
    pub fn new(fetcher: F, cache: C, pacer: Pacer) -> Self {
        Self {
            fetcher,
            cache,
            pacer,
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Chapter index for a fiction URL (or `id/slug`), from the cache when present.
    pub fn resolve_index(&self, fiction_url: &str) -> Result<ChapterIndex, Error> {
        let fiction = parse_fiction_id(fiction_url).map_err(Error::InvalidFictionUrl)?;
        self.index_for(&fiction, false)
    }

    /// Re-fetch and re-store the index, ignoring any cached copy.
    pub fn refresh_index(&self, fiction_url: &str) -> Result<ChapterIndex, Error> {
        let fiction = parse_fiction_id(fiction_url).map_err(Error::InvalidFictionUrl)?;
        self.index_for(&fiction, true)
    }

    pub fn list_chunks(&self, index: &ChapterIndex) -> Vec<Chunk> {
        model::list_chunks(index)
    }

    pub fn compile_chunk(
        &self,
        fiction: &FictionId,
        chunk: usize,
        mode: CompileMode,
    ) -> Result<CompiledDocument, Error> {
        self.compile_chunk_with_progress(fiction, chunk, mode, None)
    }

    /// Like [`compile_chunk`](Self::compile_chunk), reporting each chapter as it is resolved.
    pub fn compile_chunk_with_progress(
        &self,
        fiction: &FictionId,
        chunk: usize,
        mode: CompileMode,
        progress: Option<&dyn Fn(&ChapterProgress)>,
    ) -> Result<CompiledDocument, Error> {
        let index = self.index_for(fiction, false)?;
        let chapters = index
            .chunk_chapters(chunk)
            .ok_or_else(|| Error::ChunkOutOfRange {
                fiction: index.fiction.clone(),
                chunk,
                chunks: index.chunk_count(),
            })?;

        let total = chapters.len();
        let mut contents = Vec::with_capacity(total);
        for (i, descriptor) in chapters.iter().enumerate() {
            let slot = ChapterSlot {
                fiction: &index.fiction,
                chunk,
                position: i + 1,
                descriptor,
            };
            let (content, cached) = self.chapter_content(&slot).inspect_err(|e| {
                warn!(fiction = %index.fiction, chunk, chapter = descriptor.id, error = %e, "chunk compilation aborted");
            })?;
            if let Some(report) = progress {
                report(&ChapterProgress {
                    position: i + 1,
                    total,
                    chapter_id: descriptor.id,
                    cached,
                });
            }
            contents.push(content);
        }

        let chapters = contents
            .into_iter()
            .map(|c| CompiledChapter {
                id: c.id,
                body: content::compile(&c.html, mode),
                title: c.title,
            })
            .collect();
        info!(fiction = %index.fiction, chunk, mode = mode.as_str(), "compiled chunk");
        Ok(CompiledDocument {
            fiction: index.fiction.clone(),
            chunk,
            mode,
            chapters,
        })
    }

    fn index_for(&self, fiction: &FictionId, refresh: bool) -> Result<ChapterIndex, Error> {
        let key = CacheKey::Index(fiction.clone());
        if !refresh {
            if let Some(json) = self
                .cache
                .get(&key)
                .map_err(cache_error(Stage::CacheRead, &key))?
            {
                let index: ChapterIndex = serde_json::from_str(&json)
                    .map_err(|e| cache_error(Stage::CacheRead, &key)(e.into()))?;
                debug!(fiction = %fiction, chapters = index.chapters.len(), "index cache hit");
                return Ok(index);
            }
        }

        let url = fiction.url();
        let body = self.fetch(&url).map_err(|source| Error::IndexFetch {
            fiction: fiction.clone(),
            source,
        })?;
        let html = String::from_utf8_lossy(&body);
        let index =
            parse_chapter_index(&html, fiction.clone(), &url).map_err(|source| {
                Error::IndexParse {
                    fiction: fiction.clone(),
                    source,
                }
            })?;

        let json = serde_json::to_string(&index)
            .map_err(|e| cache_error(Stage::CacheWrite, &key)(e.into()))?;
        self.cache
            .put(&key, &json)
            .map_err(cache_error(Stage::CacheWrite, &key))?;
        info!(fiction = %fiction, chapters = index.chapters.len(), "stored chapter index");
        Ok(index)
    }

    /// Cached content for the chapter, or fetch + extract + store. Returns (content, from_cache).
    fn chapter_content(&self, slot: &ChapterSlot<'_>) -> Result<(ChapterContent, bool), Error> {
        let key = CacheKey::Content(slot.descriptor.id);
        if let Some(json) = self
            .cache
            .get(&key)
            .map_err(cache_error(Stage::CacheRead, &key))?
        {
            let content: ChapterContent = serde_json::from_str(&json)
                .map_err(|e| cache_error(Stage::CacheRead, &key)(e.into()))?;
            debug!(chapter = slot.descriptor.id, "chapter cache hit");
            return Ok((content, true));
        }

        let body = self
            .fetch(&slot.descriptor.url)
            .map_err(|e| slot.fetch_error(e))?;
        let (html, invalid) = decode_lossy(&body);
        let content = extract_chapter(&html, slot.descriptor).map_err(|e| slot.parse_error(e))?;
        if let Some(err) = invalid {
            // Bad bytes elsewhere on the page (ads, scripts) are harmless.
            if content.html.contains(char::REPLACEMENT_CHARACTER) {
                return Err(slot.sanitize_error(err));
            }
            warn!(chapter = slot.descriptor.id, error = %err, "ignoring invalid UTF-8 outside chapter content");
        }

        let json = serde_json::to_string(&content)
            .map_err(|e| cache_error(Stage::CacheWrite, &key)(e.into()))?;
        self.cache
            .put(&key, &json)
            .map_err(cache_error(Stage::CacheWrite, &key))?;
        info!(
            chapter = slot.descriptor.id,
            position = slot.position,
            "fetched and stored chapter"
        );
        Ok((content, false))
    }

    /// Paced GET; any non-2xx status is a failure. The pacing interval runs from when the
    /// response arrived.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.pacer.wait();
        debug!(url, "GET");
        let response = self.fetcher.fetch(url);
        self.pacer.mark_done();
        let response = response?;
        if !response.is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }
}
