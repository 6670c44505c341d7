//! Chapter page extraction: page title plus the content container's inner HTML.

use crate::model::{ChapterContent, ChapterDescriptor};
use crate::scraper::{strip_title_site_suffix, ParseError};
use scraper::{Html, Selector};

const TITLE_SUFFIXES: &[&str] = &[" _ Royal Road", " - Royal Road", " | Royal Road"];
const CONTENT_SELECTORS: &[&str] = &["div.chapter-inner.chapter-content", ".chapter-content"];

/// Parse a CSS selector or return a parse error (avoids panics from Selector::parse).
fn parse_selector(sel: &str) -> Result<Selector, ParseError> {
    Selector::parse(sel).map_err(|e| ParseError::InvalidSelector {
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

fn page_title(doc: &Html) -> Result<Option<String>, ParseError> {
    let h1_sel = parse_selector("h1")?;
    let og_title_sel = parse_selector("meta[property=\"og:title\"]")?;
    let title_sel = parse_selector("title")?;
    let title = doc
        .select(&h1_sel)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .find(|s| !s.is_empty())
        .or_else(|| {
            doc.select(&og_title_sel)
                .next()
                .and_then(|e| e.value().attr("content"))
                .map(|s| strip_title_site_suffix(s, TITLE_SUFFIXES))
                .filter(|s| !s.is_empty())
        })
        .or_else(|| {
            doc.select(&title_sel)
                .next()
                .map(|e| strip_title_site_suffix(&e.text().collect::<String>(), TITLE_SUFFIXES))
                .filter(|s| !s.is_empty())
        });
    Ok(title)
}

/// Pull the cacheable content out of a full chapter page. The title falls back to the
/// descriptor's title; a missing content container is an error.
pub fn extract_chapter(
    html: &str,
    descriptor: &ChapterDescriptor,
) -> Result<ChapterContent, ParseError> {
    let doc = Html::parse_document(html);
    let title = page_title(&doc)?.unwrap_or_else(|| descriptor.title.clone());

    for sel in CONTENT_SELECTORS {
        let selector = parse_selector(sel)?;
        if let Some(container) = doc.select(&selector).next() {
            return Ok(ChapterContent {
                id: descriptor.id,
                title,
                html: container.inner_html().trim().to_string(),
            });
        }
    }
    Err(ParseError::MissingChapterContent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ChapterDescriptor {
        ChapterDescriptor {
            id: 301778,
            title: "1. Good Morning Brother".to_string(),
            url: "https://www.royalroad.com/fiction/21220/s/chapter/301778/x".to_string(),
        }
    }

    #[test]
    fn extracts_title_and_inner_html() -> Result<(), ParseError> {
        let html = r#"<!DOCTYPE html><html><head><title>ignored</title></head><body>
<h1 class="font-white break-word">1. Good Morning</h1>
<div class="chapter-inner chapter-content"><p>First &lt;Skill&gt;.</p><p>Second.</p></div>
</body></html>"#;
        let content = extract_chapter(html, &descriptor())?;
        assert_eq!(content.id, 301778);
        assert_eq!(content.title, "1. Good Morning");
        assert_eq!(content.html, "<p>First &lt;Skill&gt;.</p><p>Second.</p>");
        Ok(())
    }

    #[test]
    fn title_falls_back_to_og_title_then_descriptor() -> Result<(), ParseError> {
        let html = r#"<html><head><meta property="og:title" content="1. Good Morning - Brother - Book _ Royal Road"/></head><body>
<div class="chapter-content"><p>Content.</p></div></body></html>"#;
        assert_eq!(
            extract_chapter(html, &descriptor())?.title,
            "1. Good Morning - Brother - Book"
        );

        let bare = r#"<html><body><div class="chapter-content"><p>x</p></div></body></html>"#;
        assert_eq!(extract_chapter(bare, &descriptor())?.title, "1. Good Morning Brother");
        Ok(())
    }

    #[test]
    fn missing_container_is_an_error() {
        let html = "<html><body><h1>Chapter</h1><p>no container</p></body></html>";
        assert!(matches!(
            extract_chapter(html, &descriptor()),
            Err(ParseError::MissingChapterContent)
        ));
    }
}
