//! Compiled chunk document: per-chapter compiled bodies joined with title separators.

use crate::content::brackets::escape_html;
use crate::model::{ChapterId, CompileMode, FictionId};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledChapter {
    pub id: ChapterId,
    pub title: String,
    /// Body compiled in the document's mode.
    pub body: String,
}

/// One chunk compiled in one mode. Rebuilt from cached chapter content on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledDocument {
    pub fiction: FictionId,
    pub chunk: usize,
    pub mode: CompileMode,
    pub chapters: Vec<CompiledChapter>,
}

impl CompiledDocument {
    /// First and last chapter titles, for listings.
    pub fn title_range(&self) -> Option<(&str, &str)> {
        let first = self.chapters.first()?;
        let last = self.chapters.last()?;
        Some((first.title.as_str(), last.title.as_str()))
    }
}

impl fmt::Display for CompiledDocument {
    /// TEXT and PLAIN: title, `=` underline, body, blank line between chapters (PLAIN titles
    /// are not escaped). HTML: `<h2>` title then body.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chapter) in self.chapters.iter().enumerate() {
            match self.mode {
                CompileMode::Text | CompileMode::Plain => {
                    let title = match self.mode {
                        CompileMode::Plain => chapter.title.clone(),
                        _ => escape_html(&chapter.title),
                    };
                    if i > 0 {
                        writeln!(f)?;
                    }
                    writeln!(f, "{}", title)?;
                    writeln!(f, "{}", "=".repeat(title.chars().count()))?;
                    writeln!(f, "{}", chapter.body)?;
                }
                CompileMode::Html => {
                    writeln!(f, "<h2>{}</h2>", escape_html(&chapter.title))?;
                    writeln!(f, "{}", chapter.body)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(mode: CompileMode) -> CompiledDocument {
        CompiledDocument {
            fiction: FictionId::new(1, None),
            chunk: 0,
            mode,
            chapters: vec![
                CompiledChapter {
                    id: 1,
                    title: "One".to_string(),
                    body: "first".to_string(),
                },
                CompiledChapter {
                    id: 2,
                    title: "Two & <Three>".to_string(),
                    body: "second".to_string(),
                },
            ],
        }
    }

    #[test]
    fn text_render_uses_underlined_titles() {
        let out = doc(CompileMode::Text).to_string();
        assert_eq!(
            out,
            "One\n===\nfirst\n\nTwo &amp; &lt;Three&gt;\n=======================\nsecond\n"
        );
    }

    #[test]
    fn html_render_uses_h2_and_escapes_titles() {
        let out = doc(CompileMode::Html).to_string();
        assert_eq!(
            out,
            "<h2>One</h2>\nfirst\n<h2>Two &amp; &lt;Three&gt;</h2>\nsecond\n"
        );
    }

    #[test]
    fn plain_render_leaves_titles_unescaped() {
        let out = doc(CompileMode::Plain).to_string();
        assert_eq!(out, "One\n===\nfirst\n\nTwo & <Three>\n=============\nsecond\n");
    }

    #[test]
    fn title_range_covers_first_and_last() {
        assert_eq!(doc(CompileMode::Text).title_range(), Some(("One", "Two & <Three>")));
        let mut empty = doc(CompileMode::Text);
        empty.chapters.clear();
        assert_eq!(empty.title_range(), None);
        assert_eq!(empty.to_string(), "");
    }
}
