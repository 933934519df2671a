//! Declared element dimensions.
//!
//! Attributes win over inline style. Each side checks the plain property
//! first, then `min-` and `max-`.

use kuchikiki::Attributes;
use std::fmt;

use crate::utils::css::{declarations, unescape_quotes};

/// Units that depend on layout and can't be turned into pixels here.
const RELATIVE_UNITS: &[&str] = &["em", "ex", "rem", "vw", "vh", "%", "ch"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

impl Axis {
    /// Property names checked for this axis, in priority order.
    pub const fn properties(self) -> [&'static str; 3] {
        match self {
            Self::Width => ["width", "min-width", "max-width"],
            Self::Height => ["height", "min-height", "max-height"],
        }
    }
}

/// A positive pixel length.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Dimension(f64);

impl Dimension {
    /// `None` for zero, negative or non-finite values.
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Self(value))
    }

    #[inline]
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Parse `100`, `100px` or `100.5 px`. Relative units are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let lower = text.to_ascii_lowercase();
        if RELATIVE_UNITS.iter().any(|unit| lower.ends_with(unit)) {
            return None;
        }
        let number = lower.strip_suffix("px").unwrap_or(&lower).trim_end();
        number.parse::<f64>().ok().and_then(Self::new)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0 < u64::MAX as f64 {
            write!(f, "{}", self.0 as u64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Resolve the effective size of an element along one axis.
pub fn resolve(attributes: &Attributes, axis: Axis) -> Option<Dimension> {
    let properties = axis.properties();

    let from_attribute = properties
        .iter()
        .filter_map(|name| attributes.get(*name))
        .find_map(Dimension::parse);
    if from_attribute.is_some() {
        return from_attribute;
    }

    let style = unescape_quotes(attributes.get("style")?);
    declarations(&style)
        .filter(|decl| properties.iter().any(|p| decl.is(p)))
        .find_map(|decl| Dimension::parse(decl.value))
}

/// Orientation-free aspect ratio, `max(w, h) / min(w, h)`.
pub fn aspect_ratio(width: Dimension, height: Dimension) -> f64 {
    let (w, h) = (width.get(), height.get());
    w.max(h) / w.min(h)
}
