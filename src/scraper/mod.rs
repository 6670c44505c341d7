//! Upstream site access: HTTP capability, pacing, Royal Road index parsing, and their errors.

mod client;
mod error;
mod pacer;

pub mod royalroad;

pub use client::{HttpFetch, HttpResponse, PoliteClient, PoliteClientBuilder};
pub use error::{FetchError, ParseError};
pub use pacer::Pacer;

pub const ROYALROAD_BASE: &str = "https://www.royalroad.com";

/// Strip known site suffix from the end of a page title (e.g. " - Royal Road", " | Royal Road")
/// so that titles containing " - " or " | " in the actual title are preserved.
pub fn strip_title_site_suffix(s: &str, suffixes: &[&str]) -> String {
    let mut t = s.trim();
    for suffix in suffixes {
        if t.ends_with(suffix) {
            t = t[..t.len() - suffix.len()].trim();
            break;
        }
    }
    t.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_title_site_suffix_removes_trailing_suffix_only() {
        assert_eq!(
            strip_title_site_suffix(
                "1. Good Morning - Brother - Book _ Royal Road",
                &[" _ Royal Road", " - Royal Road", " | Royal Road"]
            ),
            "1. Good Morning - Brother - Book"
        );
        assert_eq!(
            strip_title_site_suffix("Royal Road | Chapter", &[" | Royal Road"]),
            "Royal Road | Chapter"
        );
    }
}
