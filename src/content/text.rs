//! TEXT mode: strip markup, keep one line per block, then bold bracket runs.

use super::brackets::render_bolded;
use super::protect_literal_brackets;
use scraper::{ElementRef, Html, Node};

/// Elements whose boundaries end the current line.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p",
    "pre", "section", "table", "tr", "ul",
];

/// Elements whose text is never visible prose.
const DISCARD_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

#[derive(Default)]
struct LineWriter {
    lines: Vec<String>,
    current: String,
}

impl LineWriter {
    fn push(&mut self, text: &str) {
        self.current.push_str(text);
    }

    fn break_line(&mut self) {
        let line = self.current.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            self.lines.push(line);
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

fn walk(element: ElementRef<'_>, out: &mut LineWriter) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push(text),
            Node::Element(el) => {
                let name = el.name();
                if DISCARD_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.break_line();
                }
                walk(child_el, out);
                if block {
                    out.break_line();
                }
            }
            _ => {}
        }
    }
}

/// Visible text of an HTML fragment, one line per block, whitespace collapsed inside lines.
pub fn to_plain_text(fragment: &str) -> String {
    let protected = protect_literal_brackets(fragment);
    let doc = Html::parse_fragment(&protected);
    let mut writer = LineWriter::default();
    walk(doc.root_element(), &mut writer);
    writer.finish()
}

/// TEXT compile: plain text, HTML-escaped, bracket runs wrapped in `<strong>`.
pub fn compile_text(fragment: &str) -> String {
    render_bolded(&to_plain_text(fragment))
}
