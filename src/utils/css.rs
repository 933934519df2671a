//! Inline-style utilities.
//!
//! A small declaration-list tokenizer shared by dimension lookup and
//! background-image rewriting:
//! - `declarations()` splits `style` text on `;`, then on the first `:`
//! - `css_urls()` finds `url(...)` arguments inside a declaration value
//!
//! Both report byte ranges into the original text so callers can edit
//! the attribute in place without re-serializing the whole declaration list.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

// ============================================================================
// Declarations
// ============================================================================

/// One `property: value` pair of an inline style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration<'a> {
    /// Trimmed property name, case preserved.
    pub property: &'a str,
    /// Trimmed value text.
    pub value: &'a str,
    /// Byte range of `value` within the full style text.
    pub value_span: Range<usize>,
}

impl Declaration<'_> {
    /// Case-insensitive property match.
    #[inline]
    pub fn is(&self, property: &str) -> bool {
        self.property.eq_ignore_ascii_case(property)
    }
}

/// Iterate the declarations of an inline style, in source order.
///
/// Chunks without a `:` or with an empty property name are skipped.
pub fn declarations(style: &str) -> impl Iterator<Item = Declaration<'_>> {
    let mut offset = 0;
    style.split(';').filter_map(move |chunk| {
        let start = offset;
        offset += chunk.len() + 1;

        let colon = chunk.find(':')?;
        let property = chunk[..colon].trim();
        if property.is_empty() {
            return None;
        }

        let raw = &chunk[colon + 1..];
        let value = raw.trim();
        let leading = raw.len() - raw.trim_start().len();
        let value_start = start + colon + 1 + leading;

        Some(Declaration {
            property,
            value,
            value_span: value_start..value_start + value.len(),
        })
    })
}

// ============================================================================
// url(...) arguments
// ============================================================================

/// `url(...)` with optional single or double quotes around the argument.
static RE_CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:'([^']*)'|"([^"]*)"|([^'"\s)]+))\s*\)"#).unwrap()
});

/// Find every `url(...)` argument in `value`.
///
/// Returns the unquoted argument together with its byte range inside
/// `value`, so replacing the range keeps the original quotes intact.
pub fn css_urls(value: &str) -> Vec<(Range<usize>, &str)> {
    RE_CSS_URL
        .captures_iter(value)
        .filter_map(|caps| {
            let arg = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
            Some((arg.range(), arg.as_str()))
        })
        .collect()
}

/// Undo backslash-escaped quotes (`\"` and `\'`) left behind by
/// server-side templating.
pub fn unescape_quotes(style: &str) -> String {
    style.replace("\\\"", "\"").replace("\\'", "'")
}
