//! CDN side of a rewrite: URL template, source normalization and signing.

mod sign;
mod url;

pub use sign::UrlSigner;
pub use url::{CdnUrlBuilder, CdnUrlTemplate, encode_path, is_bypassed, is_data_url};
