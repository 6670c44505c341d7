//! Canonical data model: fiction ids, chapter descriptors, the chapter index and its chunks.
//!
//! An index is produced once per fiction by the index parser, cached as JSON, and never mutated.
//! Chunks are derived from it on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of chapters per chunk. The last chunk of an index may be shorter.
pub const CHUNK_SIZE: usize = 10;

/// Royal Road chapter id, unique within a fiction (and in practice site-wide).
pub type ChapterId = u64;

/// Fiction identity: numeric id plus the optional URL slug.
///
/// The id alone identifies the fiction; the slug is kept for building a readable URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FictionId {
    pub id: u64,
    pub slug: Option<String>,
}

impl FictionId {
    pub fn new(id: u64, slug: Option<String>) -> Self {
        Self {
            id,
            slug: slug.filter(|s| !s.is_empty()),
        }
    }

    /// Canonical fiction page URL on Royal Road.
    pub fn url(&self) -> String {
        match &self.slug {
            Some(slug) => format!("{}/fiction/{}/{}", crate::scraper::ROYALROAD_BASE, self.id, slug),
            None => format!("{}/fiction/{}", crate::scraper::ROYALROAD_BASE, self.id),
        }
    }
}

impl fmt::Display for FictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slug {
            Some(slug) => write!(f, "{}/{}", self.id, slug),
            None => write!(f, "{}", self.id),
        }
    }
}

/// One entry of the chapter index, in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    pub id: ChapterId,
    pub title: String,
    /// Absolute URL of the chapter page.
    pub url: String,
}

/// Ordered chapter list of one fiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterIndex {
    pub fiction: FictionId,
    /// Page the index was parsed from.
    pub source_url: String,
    pub fetched_at: DateTime<Utc>,
    pub chapters: Vec<ChapterDescriptor>,
}

impl ChapterIndex {
    pub fn chunk_count(&self) -> usize {
        self.chapters.len().div_ceil(CHUNK_SIZE)
    }

    /// Chapters of chunk `k`, or None when `k` is past the last chunk.
    pub fn chunk_chapters(&self, k: usize) -> Option<&[ChapterDescriptor]> {
        let chunk = Chunk::for_index(k, self.chapters.len())?;
        Some(&self.chapters[chunk.start..chunk.end])
    }
}

/// Contiguous slice `[start, end)` of an index. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// 0-based chunk number.
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub size: usize,
}

impl Chunk {
    /// Chunk `k` of an index with `total` chapters. None when out of range.
    pub fn for_index(k: usize, total: usize) -> Option<Chunk> {
        let start = k.checked_mul(CHUNK_SIZE)?;
        if start >= total {
            return None;
        }
        let end = (start + CHUNK_SIZE).min(total);
        Some(Chunk {
            index: k,
            start,
            end,
            size: end - start,
        })
    }
}

/// All chunks of an index in order: ceil(N / 10) entries.
pub fn list_chunks(index: &ChapterIndex) -> Vec<Chunk> {
    let total = index.chapters.len();
    (0..index.chunk_count())
        .filter_map(|k| Chunk::for_index(k, total))
        .collect()
}

/// Extracted chapter body as cached: page title plus the inner HTML of the content container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterContent {
    pub id: ChapterId,
    pub title: String,
    pub html: String,
}

/// Output representation of a compiled chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileMode {
    /// Escaped plain text, bracket runs bolded.
    Text,
    /// Unescaped plain text with brackets kept as written, for `.txt` downloads.
    Plain,
    /// Allow-listed HTML fragment, bracket runs bolded.
    Html,
}

impl CompileMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CompileMode::Text => "text",
            CompileMode::Plain => "plain",
            CompileMode::Html => "html",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(n: usize) -> ChapterIndex {
        ChapterIndex {
            fiction: FictionId::new(21220, Some("mother-of-learning".to_string())),
            source_url: "https://www.royalroad.com/fiction/21220/mother-of-learning".to_string(),
            fetched_at: Utc::now(),
            chapters: (0..n as u64)
                .map(|i| ChapterDescriptor {
                    id: 1000 + i,
                    title: format!("Chapter {}", i + 1),
                    url: format!("https://www.royalroad.com/fiction/21220/s/chapter/{}", 1000 + i),
                })
                .collect(),
        }
    }

    #[test]
    fn list_chunks_counts_and_sizes() {
        for n in [0usize, 1, 9, 10, 11, 20, 25, 101] {
            let index = index_with(n);
            let chunks = list_chunks(&index);
            assert_eq!(chunks.len(), n.div_ceil(CHUNK_SIZE), "n = {}", n);
            for (k, c) in chunks.iter().enumerate() {
                assert_eq!(c.index, k);
                if k + 1 < chunks.len() {
                    assert_eq!(c.size, CHUNK_SIZE);
                } else {
                    assert!(c.size >= 1 && c.size <= CHUNK_SIZE);
                }
            }
        }
    }

    #[test]
    fn chunks_concatenate_to_index_order() {
        let index = index_with(37);
        let rebuilt: Vec<ChapterId> = list_chunks(&index)
            .iter()
            .flat_map(|c| index.chapters[c.start..c.end].iter().map(|ch| ch.id))
            .collect();
        let expected: Vec<ChapterId> = index.chapters.iter().map(|c| c.id).collect();
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn chunk_boundaries_are_deterministic() {
        let index = index_with(25);
        let last = index.chunk_chapters(2).unwrap();
        assert_eq!(last.len(), 5);
        assert_eq!(last[0].id, 1020);
        assert!(index.chunk_chapters(3).is_none());
        assert_eq!(Chunk::for_index(1, 25), Some(Chunk { index: 1, start: 10, end: 20, size: 10 }));
    }

    #[test]
    fn out_of_range_chunk_on_huge_index_does_not_overflow() {
        assert!(Chunk::for_index(usize::MAX, 5).is_none());
    }

    #[test]
    fn fiction_id_display_and_url() {
        let with_slug = FictionId::new(41656, Some("chaotic-craftsman".to_string()));
        assert_eq!(with_slug.to_string(), "41656/chaotic-craftsman");
        assert_eq!(
            with_slug.url(),
            "https://www.royalroad.com/fiction/41656/chaotic-craftsman"
        );
        let bare = FictionId::new(41656, Some(String::new()));
        assert_eq!(bare.slug, None);
        assert_eq!(bare.url(), "https://www.royalroad.com/fiction/41656");
    }

    #[test]
    fn chapter_index_json_round_trip() -> Result<(), serde_json::Error> {
        let index = index_with(3);
        let json = serde_json::to_string(&index)?;
        assert!(json.contains("\"fetched_at\""));
        let back: ChapterIndex = serde_json::from_str(&json)?;
        assert_eq!(back, index);
        Ok(())
    }
}
