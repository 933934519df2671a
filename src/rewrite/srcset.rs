//! Responsive source sets (`srcset`, lazy `data-*-srcset`).

use regex::Regex;
use std::sync::LazyLock;

/// Entries are separated by a comma followed by whitespace, so commas
/// inside a URL (`w_300,h_200`) don't split it.
static RE_ENTRY_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s+").unwrap());

/// Trailing size hint of a source set entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// `300w`
    Width(u32),
    /// `2x`, `1.5x`
    Density(String),
    /// Entry without descriptor.
    None,
}

impl Descriptor {
    fn parse(text: &str) -> Option<Self> {
        if let Some(number) = text.strip_suffix(['w', 'W']) {
            return number.parse().ok().map(Self::Width);
        }
        let number = text.strip_suffix(['x', 'X'])?;
        number
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|_| Self::Density(text.to_string()))
    }
}

/// One `<url> <descriptor>` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetEntry<'a> {
    pub url: &'a str,
    pub descriptor: Descriptor,
    /// Descriptor exactly as written, empty when absent.
    pub raw_descriptor: &'a str,
}

impl<'a> SrcsetEntry<'a> {
    fn parse(entry: &'a str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }

        if let Some((url, descriptor)) = entry.rsplit_once(char::is_whitespace)
            && let Some(parsed) = Descriptor::parse(descriptor)
        {
            return Some(Self {
                url: url.trim_end(),
                descriptor: parsed,
                raw_descriptor: descriptor,
            });
        }

        Some(Self {
            url: entry,
            descriptor: Descriptor::None,
            raw_descriptor: "",
        })
    }

    /// Render with a replacement URL, descriptor untouched.
    pub fn render(&self, url: &str) -> String {
        if self.raw_descriptor.is_empty() {
            url.to_string()
        } else {
            format!("{url} {}", self.raw_descriptor)
        }
    }
}

/// Split a source set into entries.
pub fn parse(value: &str) -> Vec<SrcsetEntry<'_>> {
    RE_ENTRY_SEPARATOR
        .split(value)
        .filter_map(SrcsetEntry::parse)
        .collect()
}

/// Join rendered entries back into a source set.
pub fn join(entries: &[String]) -> String {
    entries.join(", ")
}

/// Check if an attribute value reads as a source set rather than one URL.
pub fn is_responsive(value: &str) -> bool {
    let entries = parse(value);
    entries.len() > 1 || entries.iter().any(|e| e.descriptor != Descriptor::None)
}
