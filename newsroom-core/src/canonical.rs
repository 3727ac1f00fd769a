//! Title and URL canonicalization
//!
//! Everything that feeds an article's content hash lives here so that the
//! hash stays a pure function of (title, url).

use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters that only carry campaign/referral tracking
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "mc_cid", "mc_eid", "igshid", "ref", "ref_src", "cmpid", "_ga",
    "spm",
];

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("utm_") || TRACKING_PARAMS.contains(&lower.as_str())
}

/// Collapse runs of whitespace into single spaces and trim both ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-cased, whitespace-collapsed title used for hashing
pub fn normalize_title(title: &str) -> String {
    collapse_whitespace(title).to_lowercase()
}

/// Remove tracking parameters and the fragment from a URL
///
/// The remaining query parameters keep their original order.
pub fn strip_tracking(url: &Url) -> Url {
    let mut cleaned = url.clone();
    cleaned.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        cleaned.set_query(None);
    } else if kept.len() != url.query_pairs().count() {
        cleaned.query_pairs_mut().clear().extend_pairs(kept.iter());
    }

    cleaned
}

/// Canonical string form of a URL used as dedup key material
///
/// Tracking parameters and fragment are removed, a trailing slash on a
/// non-root path is dropped, and the whole string is lower-cased.
pub fn canonical_url_key(url: &Url) -> String {
    let mut canonical = strip_tracking(url);

    let path = canonical.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        canonical.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }

    canonical.as_str().to_lowercase()
}

/// Stable content hash of a (title, url) pair
///
/// Normalized titles never contain a newline, so the separator keeps the
/// two components unambiguous.
pub fn content_id(title: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_title(title).as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_url_key(url).as_bytes());
    hex::encode(&hasher.finalize()[..16])
}
