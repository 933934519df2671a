//! The rewrite pass.
//!
//! ```text
//! html ─► classify ─► parse ─► scan (Locator) ─┐
//!                                              ▼
//!            for each reference: resolve ─► mutate ─► mark
//!                                              │
//! html ◄── serialize (or original input if nothing was marked)
//! ```
//!
//! # Modules
//!
//! - `locate`: candidate discovery and class guards
//! - `dimension`: width/height from attributes and inline style
//! - `mutation`: mutation directive precedence
//! - `srcset`: responsive source set entries

mod dimension;
mod locate;
mod mutation;
mod srcset;

pub use dimension::{Axis, Dimension, aspect_ratio, resolve};
pub use locate::{ImageReference, Located, Locator, ReferenceKind};
pub use mutation::{AUTO, MutationDirective};
pub use srcset::{Descriptor, SrcsetEntry};

use kuchikiki::{ElementData, NodeRef};

use crate::cdn::CdnUrlBuilder;
use crate::config::{ConfigError, RewriteConfig};
use crate::debug;
use crate::dom::{self, Document, Input};
use crate::utils::css::{css_urls, declarations};

/// Attribute holding the browser's lazy-loading hint.
const LOADING_ATTRIBUTE: &str = "loading";

// =============================================================================
// Public entry points
// =============================================================================

/// Rewrite every image reference in `html` with a one-off [`Rewriter`].
pub fn rewrite_html(html: &str, config: &RewriteConfig) -> Result<String, ConfigError> {
    Ok(Rewriter::new(config)?.rewrite(html))
}

/// Counters for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Elements with at least one rewritten source.
    pub rewritten: usize,
    /// Elements that received the initialized marker.
    pub marked: usize,
    /// Candidates skipped by class guards.
    pub ignored: usize,
    /// Sources left untouched (`data:`, `.svg`, empty).
    pub bypassed: usize,
}

/// Rewritten HTML together with what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteReport {
    pub html: String,
    pub stats: RewriteStats,
}

/// Validated configuration ready to rewrite any number of documents.
///
/// `Rewriter` holds no per-document state; share one across threads.
#[derive(Debug, Clone)]
pub struct Rewriter {
    config: RewriteConfig,
    urls: CdnUrlBuilder,
    locator: Locator,
}

impl Rewriter {
    pub fn new(config: &RewriteConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            urls: CdnUrlBuilder::new(config)?,
            locator: Locator::new(config),
        })
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Rewrite a document and return the new HTML.
    pub fn rewrite(&self, html: &str) -> String {
        self.rewrite_with_report(html).html
    }

    /// Rewrite raw bytes, decoded as UTF-8 on a best-effort basis.
    pub fn rewrite_bytes(&self, bytes: &[u8]) -> String {
        self.rewrite(&dom::decode(bytes))
    }

    /// Rewrite a document, reporting what was done.
    ///
    /// - blank input yields an empty string
    /// - input without markup is returned verbatim
    /// - input in which no element was marked is returned verbatim
    pub fn rewrite_with_report(&self, html: &str) -> RewriteReport {
        let markup = match dom::classify(html) {
            Input::Blank => return RewriteReport::unchanged(String::new()),
            Input::PlainText => return RewriteReport::unchanged(html.to_string()),
            Input::Markup(markup) => markup,
        };

        let (document, stats) = self.rewrite_document(Document::parse(markup));
        let html = if stats.marked == 0 {
            html.to_string()
        } else {
            document.serialize()
        };

        debug!(
            "rewrite";
            "{} rewritten, {} marked, {} ignored, {} bypassed",
            stats.rewritten, stats.marked, stats.ignored, stats.bypassed
        );
        RewriteReport { html, stats }
    }

    /// Rewrite an already parsed document in place.
    ///
    /// The tree is handed in and back out, so no parser state outlives the call.
    pub fn rewrite_document(&self, document: Document) -> (Document, RewriteStats) {
        let located = self.locator.locate(document.root());

        let mut pass = Pass {
            rewriter: self,
            stats: RewriteStats {
                ignored: located.ignored,
                ..RewriteStats::default()
            },
            pictures: Vec::new(),
        };
        for reference in &located.references {
            pass.process(reference);
        }
        pass.mark_pictures();

        let stats = pass.stats;
        (document, stats)
    }
}

impl RewriteReport {
    fn unchanged(html: String) -> Self {
        Self {
            html,
            stats: RewriteStats::default(),
        }
    }
}

// =============================================================================
// Per-document pass
// =============================================================================

/// Sizing context shared by every source of one element.
struct SourceContext {
    width: Option<Dimension>,
    height: Option<Dimension>,
    fill: bool,
    custom: Vec<String>,
}

/// How an attribute value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceShape {
    Single,
    Responsive,
}

struct Pass<'r> {
    rewriter: &'r Rewriter,
    stats: RewriteStats,
    /// `<picture>` parents of rewritten sources, marked after all children.
    pictures: Vec<NodeRef>,
}

impl Pass<'_> {
    fn config(&self) -> &RewriteConfig {
        &self.rewriter.config
    }

    /// Rewrite one reference and mark its element.
    ///
    /// `img` and `source` elements are always marked, even when every source
    /// was bypassed. Background styles are marked once they carry a
    /// `url(...)` in a background declaration.
    fn process(&mut self, reference: &ImageReference) {
        let rewritten = match reference.kind {
            ReferenceKind::Img | ReferenceKind::PictureSource => {
                Some(self.rewrite_sources(reference))
            }
            ReferenceKind::BackgroundStyle => self.rewrite_background(&reference.element),
        };
        let Some(rewritten) = rewritten else {
            return;
        };

        if rewritten {
            self.stats.rewritten += 1;
        }
        self.mark(&reference.element);
        if reference.kind != ReferenceKind::BackgroundStyle {
            set_loading_hint(&reference.element);
        }
        if reference.kind == ReferenceKind::PictureSource
            && let Some(picture) = reference.parent()
            && !self.pictures.contains(&picture)
        {
            self.pictures.push(picture);
        }
    }

    fn mark(&mut self, element: &ElementData) {
        if dom::add_class(element, &self.rewriter.config.initialized_class) {
            self.stats.marked += 1;
        }
    }

    fn mark_pictures(&mut self) {
        for picture in std::mem::take(&mut self.pictures) {
            if let Some(element) = picture.as_element() {
                self.mark(element);
            }
        }
    }

    // -------------------------------------------------------------------------
    // img / source
    // -------------------------------------------------------------------------

    fn source_context(&self, reference: &ImageReference) -> SourceContext {
        let config = self.config();
        let (width, height) = {
            let attributes = reference.element.attributes.borrow();
            (
                resolve(&attributes, Axis::Width),
                resolve(&attributes, Axis::Height),
            )
        };

        let mut custom: Vec<String> = Vec::new();
        for class in &reference.classes {
            if let Some(token) = config.class_mutations.get(class)
                && !custom.contains(token)
            {
                custom.push(token.clone());
            }
        }

        SourceContext {
            width,
            height,
            fill: reference.inherits_class(&config.fill_class),
            custom,
        }
    }

    fn rewrite_sources(&mut self, reference: &ImageReference) -> bool {
        let context = self.source_context(reference);
        let element = &reference.element;

        let mut changed = self.rewrite_attribute(element, "src", Some(SourceShape::Single), &context);
        changed |= self.rewrite_attribute(element, "srcset", Some(SourceShape::Responsive), &context);

        let rewriter = self.rewriter;
        for name in &rewriter.config.lazy_attributes {
            changed |= self.rewrite_attribute(element, name, None, &context);
        }

        changed
    }

    /// Rewrite one attribute. `shape: None` guesses from the value.
    fn rewrite_attribute(
        &mut self,
        element: &ElementData,
        name: &str,
        shape: Option<SourceShape>,
        context: &SourceContext,
    ) -> bool {
        let Some(value) = element.attributes.borrow().get(name).map(str::to_string) else {
            return false;
        };

        let shape = shape.unwrap_or(if srcset::is_responsive(&value) {
            SourceShape::Responsive
        } else {
            SourceShape::Single
        });
        let rewritten = match shape {
            SourceShape::Single => self.rewrite_single(&value, context),
            SourceShape::Responsive => self.rewrite_srcset(&value, context),
        };

        match rewritten {
            Some(new) if new != value => {
                element.attributes.borrow_mut().insert(name, new);
                true
            }
            _ => false,
        }
    }

    fn rewrite_single(&mut self, source: &str, context: &SourceContext) -> Option<String> {
        let mutation =
            MutationDirective::build(context.width, context.height, context.fill, &context.custom);
        self.build_url(source, &mutation)
    }

    fn rewrite_srcset(&mut self, value: &str, context: &SourceContext) -> Option<String> {
        let mut changed = false;
        let mut rendered = Vec::new();

        for entry in srcset::parse(value) {
            let mutation = MutationDirective::for_descriptor(
                &entry.descriptor,
                &context.custom,
            );
            match self.build_url(entry.url, &mutation) {
                Some(url) => {
                    changed = true;
                    rendered.push(entry.render(&url));
                }
                None => rendered.push(entry.render(entry.url)),
            }
        }

        changed.then(|| srcset::join(&rendered))
    }

    // -------------------------------------------------------------------------
    // background styles
    // -------------------------------------------------------------------------

    /// Rewrite `url(...)` arguments of `background`/`background-image`
    /// declarations in place, keeping the rest of the style text as is.
    ///
    /// `None` when no background declaration holds a `url(...)`, otherwise
    /// whether any of them was rewritten.
    fn rewrite_background(&mut self, element: &ElementData) -> Option<bool> {
        let style = element.attributes.borrow().get("style").map(str::to_string)?;

        let mut found = false;
        let mut edits = Vec::new();
        let auto = MutationDirective::auto();
        for decl in declarations(&style).filter(|d| d.is("background") || d.is("background-image"))
        {
            for (range, url) in css_urls(decl.value) {
                found = true;
                if let Some(new) = self.build_url(url, &auto) {
                    let start = decl.value_span.start + range.start;
                    edits.push((start..start + range.len(), new));
                }
            }
        }
        if !found {
            return None;
        }
        if edits.is_empty() {
            return Some(false);
        }

        let mut updated = style;
        for (range, new) in edits.into_iter().rev() {
            updated.replace_range(range, &new);
        }
        element.attributes.borrow_mut().insert("style", updated);
        Some(true)
    }

    fn build_url(&mut self, source: &str, mutation: &MutationDirective) -> Option<String> {
        let url = self.rewriter.urls.build(source, mutation);
        if url.is_none() {
            self.stats.bypassed += 1;
            debug!("rewrite"; "leaving `{}` untouched", truncate(source, 60));
        }
        url
    }
}

fn set_loading_hint(element: &ElementData) {
    let mut attributes = element.attributes.borrow_mut();
    if !attributes.contains(LOADING_ATTRIBUTE) {
        attributes.insert(LOADING_ATTRIBUTE, "lazy".to_string());
    }
}

/// Shorten long sources (inline data) for log output.
fn truncate(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(idx, _)| &text[..idx])
}
