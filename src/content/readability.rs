//! Primary-content distillation.
//!
//! Picks the element most likely to hold the article body, then serializes
//! it again without scripts, navigation, comment forms and similar chrome.
//! Relative links and image sources are resolved against the page URL so
//! the fragment stands on its own.

use ego_tree::iter::Edge;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use url::Url;

/// Containers that usually wrap the article body, most specific first.
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[role='main']",
    "main",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".post-body",
    "#content",
    ".content",
];

/// Elements dropped from the distilled fragment together with their subtree.
const STRIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "iframe", "nav", "header", "footer", "aside", "form", "button",
    "svg", "template",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A container needs at least this much text to beat the `<body>` fallback.
const MIN_CANDIDATE_CHARS: usize = 50;

/// Documents nested deeper than this are refused. The markdown converter
/// walks the distilled fragment recursively.
pub const MAX_NESTING_DEPTH: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DistillError {
    /// Nothing readable was left after stripping page chrome
    #[error("No readable content found")]
    NoContent,
    /// Element nesting exceeds [`MAX_NESTING_DEPTH`]
    #[error("Document nested too deeply ({0} levels)")]
    TooDeep(usize),
}

/// Readable part of an HTML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distilled {
    /// Contents of `<title>`, if any
    pub title: Option<String>,
    /// Cleaned HTML fragment of the primary content
    pub content: String,
    /// Number of non-whitespace characters of text in `content`
    pub text_len: usize,
}

/// Extract the primary content of an HTML document.
///
/// `page_url` is used to absolutize `href` and `src` attributes; pass `None`
/// to keep them as written.
pub fn distill(html: &str, page_url: Option<&Url>) -> Result<Distilled, DistillError> {
    let document = Html::parse_document(html);

    let depth = max_depth(document.root_element());
    if depth > MAX_NESTING_DEPTH {
        return Err(DistillError::TooDeep(depth));
    }

    let title = select_first(&document, "title")
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let root = find_content_root(&document)
        .or_else(|| select_first(&document, "body"))
        .ok_or(DistillError::NoContent)?;

    let mut content = String::new();
    write_element(root, page_url, &mut content);

    let text_len = text_len_of(&Html::parse_fragment(&content).root_element());
    if text_len == 0 {
        return Err(DistillError::NoContent);
    }

    Ok(Distilled {
        title,
        content,
        text_len,
    })
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

/// First selector whose longest match carries enough text wins.
fn find_content_root(document: &Html) -> Option<ElementRef<'_>> {
    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        let best = document
            .select(&selector)
            .map(|el| (text_len_of(&el), el))
            .max_by_key(|(len, _)| *len);

        if let Some((len, el)) = best {
            if len >= MIN_CANDIDATE_CHARS {
                return Some(el);
            }
        }
    }
    None
}

fn text_len_of(element: &ElementRef<'_>) -> usize {
    element
        .text()
        .map(|t| t.chars().filter(|c| !c.is_whitespace()).count())
        .sum()
}

/// Serialize `root` without the stripped elements.
///
/// Walks the subtree with `traverse()` rather than recursion, so nesting
/// depth never reaches the call stack.
fn write_element(root: ElementRef<'_>, page_url: Option<&Url>, out: &mut String) {
    // Depth inside a stripped subtree; 0 means we are writing
    let mut skipping = 0usize;

    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(el) => {
                    let name = el.name();
                    if skipping > 0 || STRIPPED_ELEMENTS.contains(&name) {
                        skipping += 1;
                        continue;
                    }
                    write_open_tag(name, el.attrs(), page_url, out);
                }
                Node::Text(text) if skipping == 0 => push_escaped(text, false, out),
                _ => {}
            },
            Edge::Close(node) => {
                let Node::Element(el) = node.value() else {
                    continue;
                };
                if skipping > 0 {
                    skipping -= 1;
                    continue;
                }
                let name = el.name();
                if !VOID_ELEMENTS.contains(&name) {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }
}

fn write_open_tag<'a>(
    name: &str,
    attrs: impl Iterator<Item = (&'a str, &'a str)>,
    page_url: Option<&Url>,
    out: &mut String,
) {
    out.push('<');
    out.push_str(name);
    for (attr, val) in attrs {
        // Inline handlers and styles carry no content
        if attr.starts_with("on") || attr == "style" {
            continue;
        }
        let val = match (attr, page_url) {
            ("href" | "src", Some(base)) => base
                .join(val)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| val.to_string()),
            _ => val.to_string(),
        };
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        push_escaped(&val, true, out);
        out.push('"');
    }
    out.push('>');
}

/// Deepest element nesting below `root`
fn max_depth(root: ElementRef<'_>) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for edge in root.traverse() {
        match edge {
            Edge::Open(node) if node.value().is_element() => {
                depth += 1;
                max = max.max(depth);
            }
            Edge::Close(node) if node.value().is_element() => depth -= 1,
            _ => {}
        }
    }
    max
}

fn push_escaped(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
