//! Mutation directives: the `/ext/{mutation}` segment of a CDN URL.
//!
//! | custom tokens | width | height | fill  | directive                                   |
//! |---------------|-------|--------|-------|---------------------------------------------|
//! | non-empty     | any   | any    | any   | `{tokens},auto`                             |
//! | -             | -     | h      | any   | `resize_x{h}shrink,auto`                    |
//! | -             | w     | -      | any   | `resize_{w}shrink,auto`                     |
//! | -             | w     | h      | true  | `resize_{w}x{h},crop_..,pos_center,fill_..` |
//! | -             | w     | h      | false | `fit_{w}x{h},auto`                          |
//! | -             | -     | -      | any   | `auto`                                      |

use smallvec::SmallVec;
use std::fmt;

use super::dimension::Dimension;
use super::srcset::Descriptor;

/// Token every directive ends with.
pub const AUTO: &str = "auto";

/// Ordered transformation tokens, always terminated by `auto`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationDirective {
    tokens: SmallVec<[String; 6]>,
}

impl MutationDirective {
    /// The bare `auto` directive.
    pub fn auto() -> Self {
        Self::from_tokens(std::iter::empty::<String>())
    }

    /// Append `auto` to the given tokens.
    fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: SmallVec<[String; 6]> = tokens.into_iter().map(Into::into).collect();
        tokens.push(AUTO.to_string());
        Self { tokens }
    }

    /// Pick the directive for an element's declared box.
    pub fn build(
        width: Option<Dimension>,
        height: Option<Dimension>,
        fill: bool,
        custom: &[String],
    ) -> Self {
        if !custom.is_empty() {
            return Self::from_tokens(custom.iter().cloned());
        }

        match (width, height) {
            (None, Some(h)) => Self::from_tokens([format!("resize_x{h}shrink")]),
            (Some(w), None) => Self::from_tokens([format!("resize_{w}shrink")]),
            (Some(w), Some(h)) if fill => Self::from_tokens([
                format!("resize_{w}x{h}"),
                format!("crop_{w}x{h}"),
                "pos_center".to_string(),
                format!("fill_{w}x{h}"),
                "bg_transparent".to_string(),
            ]),
            (Some(w), Some(h)) => Self::from_tokens([format!("fit_{w}x{h}")]),
            (None, None) => Self::auto(),
        }
    }

    /// Directive for one entry of a responsive source set.
    ///
    /// Width descriptors add a `resize_{w}` token ahead of the custom tokens.
    /// Density descriptors only carry the custom tokens.
    pub fn for_descriptor(descriptor: &Descriptor, custom: &[String]) -> Self {
        let resize = match descriptor {
            Descriptor::Width(w) => Some(format!("resize_{w}")),
            Descriptor::Density(_) | Descriptor::None => None,
        };

        Self::from_tokens(resize.into_iter().chain(custom.iter().cloned()))
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl fmt::Display for MutationDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(","))
    }
}
