//! Bracket-to-bold transform shared by both compile modes.
//!
//! `<x>`, `[x]` and `{x}` runs in visible text become bold `x` with the delimiters dropped.
//! A run must close on the same line, contain something other than whitespace, and have no
//! second opener of its own kind before the closer. Anything else stays literal, so an
//! unterminated `[open` is never partially bolded and for `[a [b] c]` only `b` is bolded.

/// Piece of a text run after bracket detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Bold(&'a str),
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'<' => Some(b'>'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

/// Length of the run content following an opener, if the run closes validly.
fn match_run(rest: &[u8], open: u8, close: u8) -> Option<usize> {
    for (j, &c) in rest.iter().enumerate() {
        if c == close {
            let content = &rest[..j];
            if content.iter().all(u8::is_ascii_whitespace) {
                return None;
            }
            return Some(j);
        }
        if c == open || c == b'\n' {
            return None;
        }
    }
    None
}

/// Split `s` into literal and bold segments. Concatenating the segments with their delimiters
/// restored gives back `s`.
pub fn bracket_segments(s: &str) -> Vec<Segment<'_>> {
    // Delimiters are ASCII, so every index that holds one is a char boundary.
    let bytes = s.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(close) = closer_for(bytes[i]) {
            if let Some(len) = match_run(&bytes[i + 1..], bytes[i], close) {
                if text_start < i {
                    segments.push(Segment::Text(&s[text_start..i]));
                }
                segments.push(Segment::Bold(&s[i + 1..i + 1 + len]));
                i += len + 2;
                text_start = i;
                continue;
            }
        }
        i += 1;
    }
    if text_start < s.len() {
        segments.push(Segment::Text(&s[text_start..]));
    }
    segments
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Append `text` to `out` HTML-escaped, with bracket runs wrapped in `<strong>`.
pub fn push_bolded(out: &mut String, text: &str) {
    for segment in bracket_segments(text) {
        match segment {
            Segment::Text(t) => out.push_str(&escape_html(t)),
            Segment::Bold(b) => {
                out.push_str("<strong>");
                out.push_str(&escape_html(b));
                out.push_str("</strong>");
            }
        }
    }
}

pub fn render_bolded(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_bolded(&mut out, text);
    out
}
