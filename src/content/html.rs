//! HTML mode: re-serialize the fragment through an allow-list with every attribute removed.

use super::brackets::push_bolded;
use super::protect_literal_brackets;
use scraper::{ElementRef, Html, Node};

/// Tags kept (without attributes). Everything else is unwrapped or dropped.
const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "hr", "em", "i", "strong", "b", "ul", "ol", "li", "blockquote",
];

const VOID_TAGS: &[&str] = &["br", "hr"];

/// Removed together with their content.
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "object", "embed", "svg", "math",
    "head", "title", "textarea", "select",
];

fn walk(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_bolded(out, text),
            Node::Element(el) => {
                let name = el.name();
                if DROPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                match ALLOWED_TAGS.iter().find(|t| **t == name) {
                    Some(tag) => {
                        out.push('<');
                        out.push_str(tag);
                        out.push('>');
                        if VOID_TAGS.contains(tag) {
                            continue;
                        }
                        walk(child_el, out);
                        out.push_str("</");
                        out.push_str(tag);
                        out.push('>');
                    }
                    None => walk(child_el, out),
                }
            }
            _ => {}
        }
    }
}

/// HTML compile: allow-listed tags only, no attributes, text escaped, bracket runs bolded.
pub fn sanitize_html(fragment: &str) -> String {
    let protected = protect_literal_brackets(fragment);
    let doc = Html::parse_fragment(&protected);
    let mut out = String::with_capacity(fragment.len());
    walk(doc.root_element(), &mut out);
    out.trim().to_string()
}
