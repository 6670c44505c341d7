//! Royal Road index parsing: fiction URL to [`FictionId`], fiction page to [`ChapterIndex`].
//!
//! The chapter list lives in an inline script as `window.chapters = [...]`. Finding the array
//! and parsing it are separate steps so each failure mode surfaces on its own.

use crate::model::{ChapterDescriptor, ChapterIndex, FictionId};
use crate::scraper::error::ParseError;
use crate::scraper::ROYALROAD_BASE;
use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;

const CHAPTERS_ANCHOR: &str = "window.chapters";

/// Shape of one entry in window.chapters. Other fields (order, date, isUnlocked...) are ignored.
#[derive(Debug, Deserialize)]
struct WindowChapter {
    id: u64,
    title: String,
    url: String,
}

/// Parse a fiction reference: a full fiction URL
/// (`https://www.royalroad.com/fiction/41656/some-slug`) or the bare `41656/some-slug` form.
/// Chapter URLs are rejected.
pub fn parse_fiction_id(input: &str) -> Result<FictionId, ParseError> {
    let input = input.trim();
    let invalid = |reason: &str| ParseError::InvalidFictionUrl {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let segments: Vec<String> = if input.contains("://") {
        let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
        let host = url.host_str().ok_or_else(|| invalid("URL has no host"))?;
        if !host.ends_with("royalroad.com") {
            return Err(invalid("not a Royal Road URL"));
        }
        let mut segments = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).map(String::from).collect::<Vec<_>>())
            .unwrap_or_default();
        if segments.first().map(String::as_str) != Some("fiction") {
            return Err(invalid(
                "expected a fiction URL like https://www.royalroad.com/fiction/<id>/<slug>",
            ));
        }
        segments.remove(0);
        segments
    } else {
        input
            .split('/')
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    };

    let id_str = segments.first().ok_or_else(|| invalid("missing fiction id"))?;
    let id: u64 = id_str
        .parse()
        .map_err(|_| invalid("fiction id did not look numeric"))?;
    if segments.get(2).map(String::as_str) == Some("chapter") {
        return Err(invalid(
            "expected a fiction (index) URL, not a chapter URL",
        ));
    }
    Ok(FictionId::new(id, segments.get(1).cloned()))
}

/// Find the `window.chapters` array literal and return it as a slice of `html`.
///
/// Earlier mentions of the name that are not an array assignment (`if (!window.chapters)`,
/// `window.chaptersCount = 3`) are skipped. When no mention qualifies, the error describes the
/// last one seen.
pub fn locate_chapters_blob(html: &str) -> Result<&str, ParseError> {
    let mut last_err = ParseError::ChapterListMissing;
    for (anchor, _) in html.match_indices(CHAPTERS_ANCHOR) {
        match assigned_array(&html[anchor + CHAPTERS_ANCHOR.len()..]) {
            Ok(blob) => return Ok(blob),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

/// The array literal assigned right after an anchor: `= [ ... ]`.
fn assigned_array(after_anchor: &str) -> Result<&str, ParseError> {
    let assign = after_anchor
        .trim_start()
        .strip_prefix('=')
        .filter(|rest| !rest.starts_with('='))
        .ok_or_else(|| ParseError::UnbalancedArray {
            reason: "window.chapters is not followed by an assignment".to_string(),
        })?;
    let value = assign.trim_start();
    if !value.starts_with('[') {
        return Err(ParseError::UnbalancedArray {
            reason: "window.chapters array start not found".to_string(),
        });
    }
    extract_json_array_with_strings(value).ok_or_else(|| ParseError::UnbalancedArray {
        reason: "window.chapters array is not closed".to_string(),
    })
}

/// Find the matching closing bracket for the leading '[' in s, skipping content inside JSON strings.
fn extract_json_array_with_strings(s: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (byte_offset, c) in s.char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            if c == '\\' {
                escape = true;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..byte_offset + 1]);
                }
            }
            '"' => in_string = true,
            _ => {}
        }
    }
    None
}

/// Parse an extracted array literal into descriptors, resolving relative URLs against the site.
pub fn parse_chapters_blob(blob: &str) -> Result<Vec<ChapterDescriptor>, ParseError> {
    let records: Vec<WindowChapter> = serde_json::from_str(blob)
        .map_err(|source| ParseError::InvalidChapterList { source })?;
    let base = Url::parse(ROYALROAD_BASE).map_err(|e| ParseError::InvalidChapterUrl {
        id: 0,
        url: ROYALROAD_BASE.to_string(),
        reason: e.to_string(),
    })?;

    let mut seen = HashSet::with_capacity(records.len());
    let mut chapters = Vec::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(ParseError::DuplicateChapterId { id: record.id });
        }
        let url = base
            .join(&record.url)
            .map_err(|e| ParseError::InvalidChapterUrl {
                id: record.id,
                url: record.url.clone(),
                reason: e.to_string(),
            })?;
        chapters.push(ChapterDescriptor {
            id: record.id,
            title: record.title.trim().to_string(),
            url: url.to_string(),
        });
    }
    Ok(chapters)
}

/// Fiction landing page to chapter index. Pure; `fiction` and `source_url` are recorded as given.
pub fn parse_chapter_index(
    html: &str,
    fiction: FictionId,
    source_url: &str,
) -> Result<ChapterIndex, ParseError> {
    let blob = locate_chapters_blob(html)?;
    let chapters = parse_chapters_blob(blob)?;
    Ok(ChapterIndex {
        fiction,
        source_url: source_url.to_string(),
        fetched_at: Utc::now(),
        chapters,
    })
}
