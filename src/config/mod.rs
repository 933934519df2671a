//! Rewrite configuration, usually loaded from `cdnify.toml`.
//!
//! # Keys
//!
//! | Key                 | Purpose                                          |
//! |---------------------|--------------------------------------------------|
//! | `storage_id`        | CDN storage identifier (first host label)        |
//! | `cdn_domain`        | CDN domain the storage lives under               |
//! | `base_path`         | Prefix that turns relative sources absolute      |
//! | `secret`            | HMAC key; enables `&sig=` on every URL           |
//! | `ignored_classes`   | Classes that exclude an element (or its child)   |
//! | `class_mutations`   | Class → custom mutation token                    |
//! | `lazy_attributes`   | Extra attributes holding lazy-load sources       |
//! | `fill_class`        | Class that switches `fit` to crop-and-fill       |
//! | `initialized_class` | Marker appended to processed elements            |
//!
//! The configuration is read-only for the whole rewrite pass; one value can be
//! shared by any number of concurrent rewrites.

mod error;

pub use error::ConfigError;

use crate::log;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Class that always excludes an element, whatever the configuration says.
pub const IGNORE_CLASS: &str = "fj-ignore";

/// Default marker class for processed elements.
pub const DEFAULT_INITIALIZED_CLASS: &str = "fj-initialized";

/// Default class requesting crop-and-fill instead of fit.
pub const DEFAULT_FILL_CLASS: &str = "fj-fill";

/// Default CDN domain.
pub const DEFAULT_CDN_DOMAIN: &str = "5gcdn.net";

// ============================================================================
// root configuration
// ============================================================================

/// Immutable settings for one rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Storage identifier, used as the first label of the CDN host.
    pub storage_id: String,

    #[serde(default = "defaults::cdn_domain")]
    pub cdn_domain: String,

    /// Prefix prepended to sources that don't already start with it.
    #[serde(default)]
    pub base_path: String,

    /// Signing secret. `None` produces unsigned URLs.
    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default)]
    pub ignored_classes: BTreeSet<String>,

    /// Class name → custom mutation token.
    #[serde(default)]
    pub class_mutations: BTreeMap<String, String>,

    /// Extra attribute names that carry lazy-load sources.
    #[serde(default = "defaults::lazy_attributes")]
    pub lazy_attributes: Vec<String>,

    #[serde(default = "defaults::fill_class")]
    pub fill_class: String,

    #[serde(default = "defaults::initialized_class")]
    pub initialized_class: String,
}

mod defaults {
    pub fn cdn_domain() -> String {
        super::DEFAULT_CDN_DOMAIN.into()
    }

    pub fn lazy_attributes() -> Vec<String> {
        vec!["data-lazy-src".into(), "data-lazy-srcset".into()]
    }

    pub fn fill_class() -> String {
        super::DEFAULT_FILL_CLASS.into()
    }

    pub fn initialized_class() -> String {
        super::DEFAULT_INITIALIZED_CLASS.into()
    }
}

impl RewriteConfig {
    /// Create a configuration with defaults for everything but the storage id.
    pub fn new(storage_id: impl Into<String>) -> Self {
        Self {
            storage_id: storage_id.into(),
            cdn_domain: defaults::cdn_domain(),
            base_path: String::new(),
            secret: None,
            ignored_classes: BTreeSet::new(),
            class_mutations: BTreeMap::new(),
            lazy_attributes: defaults::lazy_attributes(),
            fill_class: defaults::fill_class(),
            initialized_class: defaults::initialized_class(),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_cdn_domain(mut self, domain: impl Into<String>) -> Self {
        self.cdn_domain = domain.into();
        self
    }

    pub fn with_ignored_class(mut self, class: impl Into<String>) -> Self {
        self.ignored_classes.insert(class.into());
        self
    }

    pub fn with_class_mutation(mut self, class: impl Into<String>, token: impl Into<String>) -> Self {
        self.class_mutations.insert(class.into(), token.into());
        self
    }

    pub fn with_lazy_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lazy_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fill_class(mut self, class: impl Into<String>) -> Self {
        self.fill_class = class.into();
        self
    }

    pub fn with_initialized_class(mut self, class: impl Into<String>) -> Self {
        self.initialized_class = class.into();
        self
    }

    /// Every class that excludes an element: configured, built-in ignore
    /// and the initialized marker.
    pub fn excluded_classes(&self) -> impl Iterator<Item = &str> {
        self.ignored_classes
            .iter()
            .map(String::as_str)
            .chain([IGNORE_CLASS, self.initialized_class.as_str()])
    }

    // ========================================================================
    // loading
    // ========================================================================

    /// Parse configuration from TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let (config, ignored) = Self::parse_with_ignored(content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, None);
        }
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, Some(path));
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: Option<&Path>) {
        let source = path
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config".to_string());
        log!("warning"; "unknown fields in {}, ignoring: {}", source, fields.join(", "));
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Check the values a CDN URL is built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_id.is_empty() {
            return Err(ConfigError::validation("`storage_id` must not be empty"));
        }
        if !self
            .storage_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConfigError::validation(format!(
                "`storage_id` must be a host label (letters, digits, `-`), got `{}`",
                self.storage_id
            )));
        }
        if self.cdn_domain.trim().is_empty() || self.cdn_domain.contains(['/', ' ']) {
            return Err(ConfigError::validation(format!(
                "`cdn_domain` must be a bare domain, got `{}`",
                self.cdn_domain
            )));
        }

        let classes = self
            .ignored_classes
            .iter()
            .chain(self.class_mutations.keys())
            .chain([&self.fill_class, &self.initialized_class]);
        for class in classes {
            if class.is_empty() || class.contains(char::is_whitespace) {
                return Err(ConfigError::validation(format!(
                    "class names must be a single non-empty token, got `{class}`"
                )));
            }
        }

        if let Some(token) = self
            .class_mutations
            .values()
            .find(|token| {
                token.is_empty() || token.contains(['/', '?']) || token.contains(char::is_whitespace)
            })
        {
            return Err(ConfigError::validation(format!(
                "mutation tokens must not be empty or contain `/`, `?` or whitespace, got `{token}`"
            )));
        }

        Ok(())
    }
}
