//! Chapter content: extraction from a chapter page and compilation to TEXT, PLAIN or HTML.
//!
//! All modes parse the fragment with `scraper`, so real markup is consumed structurally and
//! only brackets that are visible text reach the shared bracket transform in [`brackets`].

pub mod brackets;
mod extract;
mod html;
mod text;

pub use extract::extract_chapter;
pub use html::sanitize_html;
pub use text::{compile_text, to_plain_text};

use crate::model::CompileMode;
use std::borrow::Cow;
use thiserror::Error;

/// Content that cannot be treated as text at all. Irregular HTML never produces this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("Invalid UTF-8 in chapter content at byte {valid_up_to}.")]
    InvalidUtf8 { valid_up_to: usize },
}

/// Decode a response body strictly as UTF-8.
pub fn decode_utf8(bytes: &[u8]) -> Result<&str, SanitizeError> {
    std::str::from_utf8(bytes).map_err(|e| SanitizeError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })
}

/// Decode a page with invalid sequences replaced by U+FFFD. The strict-decoding error is
/// returned alongside so the caller can check whether the damage reached the content it keeps.
pub fn decode_lossy(bytes: &[u8]) -> (Cow<'_, str>, Option<SanitizeError>) {
    match decode_utf8(bytes) {
        Ok(s) => (Cow::Borrowed(s), None),
        Err(e) => (String::from_utf8_lossy(bytes), Some(e)),
    }
}

/// Compile one chapter's body fragment in the given mode. Empty input gives empty output.
pub fn compile(fragment: &str, mode: CompileMode) -> String {
    match mode {
        CompileMode::Text => compile_text(fragment),
        CompileMode::Plain => to_plain_text(fragment),
        CompileMode::Html => sanitize_html(fragment),
    }
}

/// Tags that can appear as markup in a chapter body. RCDATA and form elements are left out:
/// `<Title Slayer>` or `<Select Target>` in prose is text, never an element.
const BODY_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "b", "bdi", "bdo", "big", "blockquote", "br",
    "caption", "center", "cite", "code", "col", "colgroup", "dd", "del", "details", "dfn",
    "div", "dl", "dt", "em", "embed", "figcaption", "figure", "font", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "i", "iframe", "img", "ins", "kbd", "li", "main",
    "mark", "nav", "noscript", "object", "ol", "p", "picture", "pre", "q", "s", "samp",
    "script", "section", "small", "source", "span", "strike", "strong", "style", "sub",
    "summary", "sup", "svg", "table", "tbody", "td", "tfoot", "th", "thead", "time", "tr",
    "tt", "u", "ul", "var", "video", "wbr",
];

/// Tags that are complete without a closing tag (void or optional end tag).
const UNCLOSED_TAGS: &[&str] = &[
    "br", "hr", "img", "wbr", "col", "source", "embed", "p", "li", "dd", "dt", "tr", "td", "th",
    "tbody", "thead", "tfoot",
];

/// Leading tag name of `s`, lowercased input assumed. Must be followed by a tag delimiter.
fn tag_name(s: &str) -> Option<&str> {
    let len = s.bytes().take_while(u8::is_ascii_alphanumeric).count();
    match s.as_bytes().get(len) {
        Some(c) if len > 0 && (c.is_ascii_whitespace() || *c == b'>' || *c == b'/') => {
            Some(&s[..len])
        }
        _ => None,
    }
}

/// True when every attribute in `attrs` has the `name=value` form.
fn attrs_are_explicit(attrs: &str) -> bool {
    let bytes = attrs.as_bytes();
    let mut i = 0;
    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i == bytes.len() {
            return true;
        }
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'/') {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            return false;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            Some(&q) if q == b'"' || q == b'\'' => {
                match bytes[i + 1..].iter().position(|&c| c == q) {
                    Some(end) => i += end + 2,
                    None => return false,
                }
            }
            Some(_) => {
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
            }
            None => return false,
        }
    }
}

/// A `</name` for `name` somewhere in `tail`.
fn has_closer(tail: &str, name: &str) -> bool {
    tail.match_indices("</").any(|(i, _)| {
        let rest = &tail[i + 2..];
        rest.starts_with(name)
            && matches!(rest.as_bytes().get(name.len()), Some(c) if c.is_ascii_whitespace() || *c == b'>')
    })
}

/// Whether the `<` at byte `at` of the lowercased fragment opens markup. An opening tag counts
/// when a matching closer follows it, or when it needs no closer and its attributes are all
/// `name=value`. So `<p class="x">` is markup while `<Time Stop>` and `<Mark>` are text.
fn opens_markup(lower: &str, at: usize) -> bool {
    let rest = &lower[at + 1..];
    match rest.as_bytes().first() {
        Some(b'!') | Some(b'?') => return true,
        Some(b'/') => return tag_name(&rest[1..]).is_some_and(|n| BODY_TAGS.contains(&n)),
        _ => {}
    }
    let Some(name) = tag_name(rest) else {
        return false;
    };
    if !BODY_TAGS.contains(&name) {
        return false;
    }
    let after_name = &rest[name.len()..];
    let Some(end) = after_name.find('>') else {
        return false;
    };
    let attrs = &after_name[..end];
    if attrs.contains('<') {
        return false;
    }
    has_closer(&after_name[end + 1..], name)
        || (UNCLOSED_TAGS.contains(&name) && attrs_are_explicit(attrs))
}

/// Escape every `<` that does not open markup, so text like `Hello <world>` or
/// `<Title Slayer>` written without entities survives parsing as text.
pub(crate) fn protect_literal_brackets(fragment: &str) -> Cow<'_, str> {
    if !fragment.contains('<') {
        return Cow::Borrowed(fragment);
    }
    // ASCII lowercasing keeps byte offsets.
    let lower = fragment.to_ascii_lowercase();
    let literal: Vec<usize> = lower
        .match_indices('<')
        .map(|(i, _)| i)
        .filter(|&i| !opens_markup(&lower, i))
        .collect();
    if literal.is_empty() {
        return Cow::Borrowed(fragment);
    }
    let mut out = String::with_capacity(fragment.len() + literal.len() * 3);
    let mut last = 0;
    for i in literal {
        out.push_str(&fragment[last..i]);
        out.push_str("&lt;");
        last = i + 1;
    }
    out.push_str(&fragment[last..]);
    Cow::Owned(out)
}
