//! cdnify - rewrite image references in HTML to CDN URLs.
//!
//! ```ignore
//! use cdnify::{RewriteConfig, Rewriter};
//!
//! let config = RewriteConfig::new("store").with_base_path("https://example.com");
//! let rewriter = Rewriter::new(&config)?;
//! let html = rewriter.rewrite(r#"<img src="/a.jpg" width="100">"#);
//! ```

pub mod cdn;
pub mod config;
pub mod dom;
pub mod logger;
pub mod rewrite;
pub mod utils;

pub use config::{ConfigError, RewriteConfig};
pub use rewrite::{RewriteReport, RewriteStats, Rewriter, rewrite_html};
