//! Lenient HTML tree: parse, inspect classes, serialize.
//!
//! Parsing goes through html5ever (via `kuchikiki`), which never fails:
//! malformed markup is repaired the way a browser would and parse errors
//! are dropped.
//!
//! Fragments (no `<html>`, `<head>`, `<body>` or doctype in the input) are
//! serialized without the wrapper elements the parser synthesizes, so a
//! snippet goes in and a snippet comes out.

use kuchikiki::traits::TendrilSink;
use kuchikiki::{ElementData, NodeRef};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Any tag-like construct: `<p`, `</p`, `<!--`, `<!doctype`, `<?xml`.
static RE_MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[A-Za-z!/?]").unwrap());

/// Document-level structure written by the author rather than the parser.
static RE_DOCUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(!doctype|html|head|body)[\s>/]").unwrap());

const BOM: char = '\u{feff}';

// =============================================================================
// Input classification
// =============================================================================

/// What a raw input turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    /// Empty or whitespace only.
    Blank,
    /// Text without a single tag.
    PlainText,
    /// Markup worth parsing, byte-order mark removed.
    Markup(&'a str),
}

/// Classify raw input before handing it to the parser.
pub fn classify(input: &str) -> Input<'_> {
    let text = input.strip_prefix(BOM).unwrap_or(input);
    if text.trim().is_empty() {
        Input::Blank
    } else if !RE_MARKUP.is_match(text) {
        Input::PlainText
    } else {
        Input::Markup(text)
    }
}

/// Best-effort UTF-8 decoding of raw bytes.
///
/// A UTF-8 byte-order mark is dropped, invalid sequences become U+FFFD.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Full,
    Fragment,
}

/// A parsed, mutable HTML tree owned by one rewrite call.
pub struct Document {
    root: NodeRef,
    shape: Shape,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let shape = if RE_DOCUMENT.is_match(html) {
            Shape::Full
        } else {
            Shape::Fragment
        };
        Self {
            root: parse(html),
            shape,
        }
    }

    /// Document node of the tree.
    #[inline]
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Check if the input was a snippet rather than a full page.
    #[inline]
    pub fn is_fragment(&self) -> bool {
        self.shape == Shape::Fragment
    }

    /// Serialize back to HTML.
    pub fn serialize(&self) -> String {
        match self.shape {
            Shape::Full => self.root.to_string(),
            Shape::Fragment => fragment_nodes(&self.root)
                .iter()
                .map(NodeRef::to_string)
                .collect(),
        }
    }
}

/// Parse HTML into a document tree.
pub fn parse(html: &str) -> NodeRef {
    kuchikiki::parse_html().one(html)
}

/// Top-level nodes of a fragment: everything except the synthesized
/// `html`, `head` and `body` wrappers.
fn fragment_nodes(root: &NodeRef) -> Vec<NodeRef> {
    let mut nodes = Vec::new();
    for child in root.children() {
        if tag_name(&child) != Some("html") {
            nodes.push(child);
            continue;
        }
        for section in child.children() {
            match tag_name(&section) {
                Some("head" | "body") => nodes.extend(section.children()),
                _ => nodes.push(section),
            }
        }
    }
    nodes
}

// =============================================================================
// Element helpers
// =============================================================================

/// Local tag name of an element node.
#[inline]
pub fn tag_name(node: &NodeRef) -> Option<&str> {
    node.as_element().map(|e| &*e.name.local)
}

/// Whitespace-separated `class` tokens of an element.
pub fn classes(element: &ElementData) -> Vec<String> {
    element
        .attributes
        .borrow()
        .get("class")
        .map(|c| c.split_ascii_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// Append `class` to the class list, dropping duplicate tokens.
///
/// Returns `false` when the element already carried `class`.
pub fn add_class(element: &ElementData, class: &str) -> bool {
    let mut attributes = element.attributes.borrow_mut();
    let current = attributes.get("class").unwrap_or("");
    if current.split_ascii_whitespace().any(|token| token == class) {
        return false;
    }
    let updated = {
        let mut tokens: Vec<&str> = Vec::new();
        for token in current.split_ascii_whitespace().chain([class]) {
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        tokens.join(" ")
    };
    attributes.insert("class", updated);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(""), Input::Blank);
        assert_eq!(classify("  \n\t"), Input::Blank);
        assert_eq!(classify("\u{feff}  "), Input::Blank);
        assert_eq!(classify("just text, 1 < 2"), Input::PlainText);
        assert_eq!(classify("\u{feff}<p>x</p>"), Input::Markup("<p>x</p>"));
        assert_eq!(classify("<!-- c -->"), Input::Markup("<!-- c -->"));
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode(b"\xEF\xBB\xBF<p>"), "<p>");
        assert_eq!(decode(b"<p>\xFF</p>"), "<p>\u{FFFD}</p>");
    }

    #[test]
    fn test_fragment_round_trip() {
        let html = r#"<p class="a">Hello <b>world</b></p><img src="x.jpg">"#;
        let doc = Document::parse(html);
        assert!(doc.is_fragment());
        assert_eq!(doc.serialize(), html);
    }

    #[test]
    fn test_full_document_keeps_wrappers() {
        let html = "<!DOCTYPE html><html><head><title>t</title></head><body><p>x</p></body></html>";
        let doc = Document::parse(html);
        assert!(!doc.is_fragment());
        let out = doc.serialize();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<head><title>t</title></head>"));
        assert!(out.contains("<body><p>x</p></body>"));
    }

    #[test]
    fn test_fragment_with_head_content() {
        let doc = Document::parse(r#"<link rel="x"><p>y</p>"#);
        let out = doc.serialize();
        assert!(out.contains("<link"));
        assert!(out.contains("<p>y</p>"));
        assert!(!out.contains("<body>"));
    }

    #[test]
    fn test_malformed_markup_is_repaired() {
        let doc = Document::parse("<div><p>unclosed<img src=a.jpg></div></span>");
        let out = doc.serialize();
        assert!(out.contains(r#"<img src="a.jpg">"#));
    }

    #[test]
    fn test_classes() {
        let root = parse(r#"<img class=" a  b a ">"#);
        let img = root.select_first("img").unwrap();
        assert_eq!(classes(&img), ["a", "b", "a"]);
    }

    #[test]
    fn test_add_class_dedupes() {
        let root = parse(r#"<img class="a b a">"#);
        let img = root.select_first("img").unwrap();
        assert!(add_class(&img, "done"));
        assert!(!add_class(&img, "done"));
        assert_eq!(img.attributes.borrow().get("class"), Some("a b done"));
    }

    #[test]
    fn test_add_class_without_existing() {
        let root = parse("<img>");
        let img = root.select_first("img").unwrap();
        add_class(&img, "done");
        assert_eq!(img.attributes.borrow().get("class"), Some("done"));
    }

    #[test]
    fn test_tag_name() {
        let root = parse("<picture><source></picture>");
        let source = root.select_first("source").unwrap();
        let parent = source.as_node().parent().unwrap();
        assert_eq!(tag_name(&parent), Some("picture"));
        assert_eq!(tag_name(&root), None);
    }
}
