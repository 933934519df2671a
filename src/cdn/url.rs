//! CDN URL construction.
//!
//! ```text
//! raw source ─► absolute (base path) ─► path segments encoded ─► form-encoded
//!            ─► https://{storage}.{domain}/ext/{mutation}?src={source}[&sig=..]
//! ```
//!
//! `data:` URIs and anything mentioning `.svg` never reach the template.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::form_urlencoded;

use super::sign::UrlSigner;
use crate::config::{ConfigError, RewriteConfig};
use crate::rewrite::MutationDirective;

/// Characters left alone inside a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Check if a source is an inline `data:` URI.
///
/// Only the scheme is looked at: media type, parameters and payload can be
/// anything, including unencoded markup.
#[inline]
pub fn is_data_url(source: &str) -> bool {
    source
        .trim_start()
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Sources the CDN must not touch: inline data and vector images.
#[inline]
pub fn is_bypassed(source: &str) -> bool {
    source.trim().is_empty() || source.contains(".svg") || is_data_url(source)
}

// ============================================================================
// Template
// ============================================================================

/// `https://{storage_id}.{domain}/ext/{mutation}?src={source}`
#[derive(Debug, Clone)]
pub struct CdnUrlTemplate {
    origin: String,
}

impl CdnUrlTemplate {
    pub fn new(storage_id: &str, domain: &str) -> Self {
        Self {
            origin: format!("https://{storage_id}.{domain}"),
        }
    }

    /// Fill both slots. `encoded_source` must already be query-safe.
    pub fn render(&self, mutation: &MutationDirective, encoded_source: &str) -> String {
        format!("{}/ext/{mutation}?src={encoded_source}", self.origin)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Turns raw `src` values into (optionally signed) CDN URLs.
#[derive(Debug, Clone)]
pub struct CdnUrlBuilder {
    template: CdnUrlTemplate,
    base_path: String,
    signer: Option<UrlSigner>,
}

impl CdnUrlBuilder {
    pub fn new(config: &RewriteConfig) -> Result<Self, ConfigError> {
        let signer = config.secret.as_deref().map(UrlSigner::new).transpose()?;
        Ok(Self {
            template: CdnUrlTemplate::new(&config.storage_id, &config.cdn_domain),
            base_path: config.base_path.clone(),
            signer,
        })
    }

    /// Build the CDN URL for `raw`, or `None` when the source is bypassed
    /// and must be left exactly as it was.
    pub fn build(&self, raw: &str, mutation: &MutationDirective) -> Option<String> {
        if is_bypassed(raw) {
            return None;
        }

        let absolute = encode_path(&self.absolute_source(raw.trim()));
        let encoded: String = form_urlencoded::byte_serialize(absolute.as_bytes()).collect();

        let mut url = self.template.render(mutation, &encoded);
        if let Some(signer) = &self.signer {
            url.push_str("&sig=");
            url.push_str(&signer.sign(&encoded));
        }
        Some(url)
    }

    /// Resolve `raw` against the base path.
    ///
    /// A plain prefix check decides whether the base path is already
    /// present. Sources with their own scheme are kept, protocol-relative
    /// ones get `https:`.
    pub fn absolute_source(&self, raw: &str) -> String {
        if let Some(rest) = raw.strip_prefix("//") {
            return format!("https://{rest}");
        }
        if self.base_path.is_empty() || raw.starts_with(&self.base_path) || has_scheme(raw) {
            return raw.to_string();
        }

        let raw = raw.strip_prefix("./").unwrap_or(raw);
        match (self.base_path.ends_with('/'), raw.starts_with('/')) {
            (true, true) => format!("{}{}", self.base_path, &raw[1..]),
            (false, false) => format!("{}/{}", self.base_path, raw),
            _ => format!("{}{}", self.base_path, raw),
        }
    }
}

/// Check for a URL scheme (`https:`, `ftp:` ...).
fn has_scheme(source: &str) -> bool {
    url::Url::parse(source).is_ok_and(|u| u.scheme().len() > 1)
}

/// Percent-encode the path of `source` segment by segment.
///
/// Segments are decoded first so already-encoded names aren't encoded twice.
/// Origin, query and fragment are kept verbatim. A `://` only marks an
/// origin when it comes before the first `/`, `?` or `#`.
pub fn encode_path(source: &str) -> String {
    let path_start = match source.find("://") {
        Some(idx) if !source[..idx].contains(['/', '?', '#']) => source[idx + 3..]
            .find(['/', '?', '#'])
            .map_or(source.len(), |p| idx + 3 + p),
        _ => 0,
    };
    let (origin, rest) = source.split_at(path_start);
    let tail_start = rest.find(['?', '#']).unwrap_or(rest.len());
    let (path, tail) = rest.split_at(tail_start);

    let encoded = path
        .split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&decoded, SEGMENT).to_string()
        })
        .collect::<Vec<_>>()
        .join("/");

    format!("{origin}{encoded}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(base: &str, secret: Option<&str>) -> CdnUrlBuilder {
        let mut config = RewriteConfig::new("store").with_base_path(base);
        config.secret = secret.map(String::from);
        CdnUrlBuilder::new(&config).unwrap()
    }

    #[test]
    fn test_data_url_detection() {
        assert!(is_data_url("data:image/png;base64,iVBORw0KGgo="));
        assert!(is_data_url("  DATA:image/gif;base64,R0lGOD=="));
        assert!(is_data_url("data:,hello"));
        assert!(is_data_url("data:image/svg+xml;charset=utf-8,%3Csvg%3E"));
        assert!(is_data_url("data:image/svg+xml;utf8,<svg xmlns=\"x\"></svg>"));
        assert!(is_data_url("data:image/png;charset=utf-8;name=x;base64,AAA="));
        assert!(is_data_url("data:image/png;base64,AAA{"));
        assert!(!is_data_url("data"));
        assert!(!is_data_url("/images/data:foo.png"));
        assert!(!is_data_url("https://example.com/a.png"));
    }

    #[test]
    fn test_data_urls_build_nothing() {
        let b = builder("https://example.com", None);
        for source in [
            "data:image/svg+xml;utf8,<svg></svg>",
            "data:image/png;charset=utf-8;name=x;base64,AAA=",
            "data:image/png;base64,AAA{",
            " Data:text/plain,\"quoted\"",
        ] {
            assert!(b.build(source, &MutationDirective::auto()).is_none(), "{source}");
        }
    }

    #[test]
    fn test_bypass() {
        assert!(is_bypassed("/logo.svg"));
        assert!(is_bypassed("/logo.svg?v=2"));
        assert!(is_bypassed("data:image/png;base64,AAA"));
        assert!(is_bypassed("   "));
        assert!(!is_bypassed("/photo.jpg"));
    }

    #[test]
    fn test_unsigned_url() {
        let url = builder("https://example.com", None)
            .build("/img/a.jpg", &MutationDirective::auto())
            .unwrap();
        assert_eq!(
            url,
            "https://store.5gcdn.net/ext/auto?src=https%3A%2F%2Fexample.com%2Fimg%2Fa.jpg"
        );
        assert!(!url.contains("sig="));
    }

    #[test]
    fn test_signed_url() {
        let url = builder("https://example.com", Some("abc"))
            .build("/a.jpg", &MutationDirective::auto())
            .unwrap();
        let encoded = "https%3A%2F%2Fexample.com%2Fa.jpg";
        let expected_sig = UrlSigner::new("abc").unwrap().sign(encoded);
        assert_eq!(
            url,
            format!("https://store.5gcdn.net/ext/auto?src={encoded}&sig={expected_sig}")
        );
    }

    #[test]
    fn test_bypassed_sources_build_nothing() {
        let b = builder("", None);
        assert!(b.build("icon.svg", &MutationDirective::auto()).is_none());
        assert!(
            b.build("data:image/png;base64,AAA", &MutationDirective::auto())
                .is_none()
        );
    }

    #[test]
    fn test_absolute_source() {
        let b = builder("https://example.com", None);
        assert_eq!(b.absolute_source("/a.jpg"), "https://example.com/a.jpg");
        assert_eq!(b.absolute_source("a.jpg"), "https://example.com/a.jpg");
        assert_eq!(b.absolute_source("./a.jpg"), "https://example.com/a.jpg");
        assert_eq!(
            b.absolute_source("https://example.com/a.jpg"),
            "https://example.com/a.jpg"
        );
        assert_eq!(
            b.absolute_source("https://other.org/a.jpg"),
            "https://other.org/a.jpg"
        );
        assert_eq!(
            b.absolute_source("//other.org/a.jpg"),
            "https://other.org/a.jpg"
        );

        let slash = builder("https://example.com/", None);
        assert_eq!(slash.absolute_source("/a.jpg"), "https://example.com/a.jpg");
    }

    #[test]
    fn test_no_base_path_keeps_source() {
        assert_eq!(builder("", None).absolute_source("/a.jpg"), "/a.jpg");
    }

    #[test]
    fn test_encode_path_segments() {
        assert_eq!(
            encode_path("https://example.com/my images/a b.jpg"),
            "https://example.com/my%20images/a%20b.jpg"
        );
        assert_eq!(
            encode_path("https://example.com/a%20b.jpg"),
            "https://example.com/a%20b.jpg"
        );
        assert_eq!(
            encode_path("https://example.com/ä.jpg?v=1 2"),
            "https://example.com/%C3%A4.jpg?v=1 2"
        );
        assert_eq!(encode_path("/x/(1).png"), "/x/%281%29.png");
        assert_eq!(encode_path("https://example.com"), "https://example.com");
        assert_eq!(
            encode_path("https://example.com?v=1"),
            "https://example.com?v=1"
        );
    }

    #[test]
    fn test_encode_path_ignores_scheme_in_query() {
        assert_eq!(
            encode_path("/p c?u=http://x/a b.jpg"),
            "/p%20c?u=http://x/a b.jpg"
        );
        assert_eq!(
            encode_path("my dir/a.jpg#see://x y"),
            "my%20dir/a.jpg#see://x y"
        );
    }

    #[test]
    fn test_space_in_filename_survives() {
        let url = builder("https://example.com", None)
            .build("/my photo.jpg", &MutationDirective::auto())
            .unwrap();
        assert!(url.ends_with("src=https%3A%2F%2Fexample.com%2Fmy%2520photo.jpg"));
    }

    #[test]
    fn test_custom_domain() {
        let config = RewriteConfig::new("s").with_cdn_domain("img.example.net");
        let url = CdnUrlBuilder::new(&config)
            .unwrap()
            .build("https://a.com/b.png", &MutationDirective::auto())
            .unwrap();
        assert!(url.starts_with("https://s.img.example.net/ext/auto?src="));
    }
}
