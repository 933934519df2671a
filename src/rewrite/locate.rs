//! Finding image references in a parsed tree.
//!
//! Three shapes qualify:
//! - `<img>` elements
//! - `<source>` elements directly inside `<picture>`
//! - any element whose inline `style` mentions `background`
//!
//! An element is skipped when it, or its parent element, carries an
//! excluded class (configured, `fj-ignore`, or the initialized marker).

use kuchikiki::{ElementData, NodeDataRef, NodeRef};
use rustc_hash::FxHashSet;

use crate::config::RewriteConfig;
use crate::debug;
use crate::dom::{self, tag_name};

/// What kind of image reference an element is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `<img src srcset ...>`
    Img,
    /// `<picture><source srcset ...></picture>`
    PictureSource,
    /// `style="background: url(...)"`
    BackgroundStyle,
}

/// A candidate element found during the scan.
///
/// Holds a handle into the tree; the tree itself stays owned by the
/// document being rewritten.
pub struct ImageReference {
    pub kind: ReferenceKind,
    pub element: NodeDataRef<ElementData>,
    pub classes: Vec<String>,
    pub parent_classes: Vec<String>,
}

impl ImageReference {
    /// Check if the element itself carries `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Check if the element or its parent element carries `class`.
    pub fn inherits_class(&self, class: &str) -> bool {
        self.has_class(class) || self.parent_classes.iter().any(|c| c == class)
    }

    /// Parent element, if the parent is an element at all.
    pub fn parent(&self) -> Option<NodeRef> {
        self.element
            .as_node()
            .parent()
            .filter(|p| p.as_element().is_some())
    }
}

/// Result of one scan.
pub struct Located {
    pub references: Vec<ImageReference>,
    /// Candidates dropped by the class guards.
    pub ignored: usize,
}

/// Walks a tree and collects non-excluded image references.
#[derive(Debug, Clone)]
pub struct Locator {
    excluded: FxHashSet<String>,
}

impl Locator {
    pub fn new(config: &RewriteConfig) -> Self {
        Self {
            excluded: config.excluded_classes().map(String::from).collect(),
        }
    }

    /// Collect every reference in document order.
    ///
    /// Nothing is modified here, so marking one element during the rewrite
    /// can't hide a sibling or child from the same pass.
    pub fn locate(&self, root: &NodeRef) -> Located {
        let mut located = Located {
            references: Vec::new(),
            ignored: 0,
        };

        for node in root.descendants() {
            let Some(element) = node.clone().into_element_ref() else {
                continue;
            };
            let kinds = candidate_kinds(&node, &element);
            if kinds.is_empty() {
                continue;
            }

            let classes = dom::classes(&element);
            let parent_classes = node
                .parent()
                .and_then(|p| p.into_element_ref())
                .map(|p| dom::classes(&p))
                .unwrap_or_default();

            if self.is_excluded(&classes) || self.is_excluded(&parent_classes) {
                debug!("rewrite"; "skipping <{}> with excluded class", &*element.name.local);
                located.ignored += 1;
                continue;
            }

            for kind in kinds {
                located.references.push(ImageReference {
                    kind,
                    element: element.clone(),
                    classes: classes.clone(),
                    parent_classes: parent_classes.clone(),
                });
            }
        }

        located
    }

    fn is_excluded(&self, classes: &[String]) -> bool {
        classes.iter().any(|c| self.excluded.contains(c))
    }
}

/// Reference kinds an element qualifies for (an `<img>` can also carry a
/// background style).
fn candidate_kinds(node: &NodeRef, element: &ElementData) -> Vec<ReferenceKind> {
    let mut kinds = Vec::new();

    match &*element.name.local {
        "img" => kinds.push(ReferenceKind::Img),
        "source" if node.parent().as_ref().and_then(tag_name) == Some("picture") => {
            kinds.push(ReferenceKind::PictureSource)
        }
        _ => {}
    }

    let has_background = element
        .attributes
        .borrow()
        .get("style")
        .is_some_and(|style| style.contains("background"));
    if has_background {
        kinds.push(ReferenceKind::BackgroundStyle);
    }

    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The root is handed back with the references: parent links are weak,
    /// so dropping it would detach every element from its parent.
    fn locate(html: &str, config: &RewriteConfig) -> (NodeRef, Located) {
        let root = dom::parse(html);
        let located = Locator::new(config).locate(&root);
        (root, located)
    }

    fn kinds(located: &Located) -> Vec<ReferenceKind> {
        located.references.iter().map(|r| r.kind).collect()
    }

    #[test]
    fn test_finds_all_shapes() {
        let html = r#"
            <img src="a.jpg">
            <picture><source srcset="b.jpg 1x"><img src="c.jpg"></picture>
            <div style="background-image: url(d.jpg)"></div>
        "#;
        let (_root, located) = locate(html, &RewriteConfig::new("s"));
        assert_eq!(
            kinds(&located),
            [
                ReferenceKind::Img,
                ReferenceKind::PictureSource,
                ReferenceKind::Img,
                ReferenceKind::BackgroundStyle,
            ]
        );
    }

    #[test]
    fn test_source_outside_picture_is_ignored() {
        let html = r#"<video><source src="a.mp4"></video>"#;
        let (_root, located) = locate(html, &RewriteConfig::new("s"));
        assert!(located.references.is_empty());
        assert_eq!(located.ignored, 0);
    }

    #[test]
    fn test_own_class_guard() {
        let config = RewriteConfig::new("s").with_ignored_class("no-cdn");
        let html = r#"<img class="x no-cdn" src="a.jpg"><img class="fj-ignore" src="b.jpg"><img src="c.jpg">"#;
        let (_root, located) = locate(html, &config);
        assert_eq!(located.references.len(), 1);
        assert_eq!(located.ignored, 2);
    }

    #[test]
    fn test_parent_class_guard() {
        let html = r#"<div class="fj-ignore"><img src="a.jpg"></div><div><img src="b.jpg"></div>"#;
        let (_root, located) = locate(html, &RewriteConfig::new("s"));
        assert_eq!(located.references.len(), 1);
        assert_eq!(located.ignored, 1);
    }

    #[test]
    fn test_initialized_is_excluded() {
        let html = r#"<img class="fj-initialized" src="a.jpg"><picture class="fj-initialized"><source srcset="b.jpg"></picture>"#;
        let (_root, located) = locate(html, &RewriteConfig::new("s"));
        assert!(located.references.is_empty());
        assert_eq!(located.ignored, 2);
    }

    #[test]
    fn test_grandparent_class_does_not_exclude() {
        let html = r#"<div class="fj-ignore"><span><img src="a.jpg"></span></div>"#;
        let (_root, located) = locate(html, &RewriteConfig::new("s"));
        assert_eq!(located.references.len(), 1);
    }

    #[test]
    fn test_img_with_background_yields_two_references() {
        let html = r#"<img src="a.jpg" style="background: url(b.jpg)">"#;
        let (_root, located) = locate(html, &RewriteConfig::new("s"));
        assert_eq!(
            kinds(&located),
            [ReferenceKind::Img, ReferenceKind::BackgroundStyle]
        );
    }

    #[test]
    fn test_inherits_class() {
        let html = r#"<div class="fj-fill"><img class="a" src="a.jpg"></div>"#;
        let (_root, located) = locate(html, &RewriteConfig::new("s"));
        let reference = &located.references[0];
        assert!(reference.inherits_class("fj-fill"));
        assert!(!reference.has_class("fj-fill"));
        assert!(reference.has_class("a"));
        assert_eq!(reference.parent().as_ref().and_then(tag_name), Some("div"));
    }
}
