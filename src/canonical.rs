// src/canonical.rs
//! URL canonicalization for dedupe identity.
//!
//! Canonical form: https scheme, lower-case host, tracking parameters and
//! fragment removed, everything else (path case, parameter order, encoding)
//! preserved as parsed. Canonicalizing a canonical URL is a no-op.

use std::fmt;

use url::{form_urlencoded, Url};

use crate::error::{IntakeError, Result};

/// Exact-match tracking keys (compared lower-cased). `utm_*` is handled by prefix.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "_ga", "_gl", "yclid", "twclid",
    "igshid", "ref", "ref_src", "ref_url", "source", "medium", "campaign", "si",
];

/// Stable dedupe identity of a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Map a raw URL to its canonical form, or fail with `InvalidUrl`.
pub fn canonicalize(raw: &str) -> Result<CanonicalUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IntakeError::invalid_url(raw, "empty"));
    }

    let mut parsed =
        Url::parse(trimmed).map_err(|e| IntakeError::invalid_url(raw, e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(IntakeError::invalid_url(
                raw,
                format!("unsupported scheme `{other}`"),
            ))
        }
    }
    let host = match parsed.host_str() {
        Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
        _ => return Err(IntakeError::invalid_url(raw, "missing host")),
    };

    if parsed.scheme() == "http" {
        parsed
            .set_scheme("https")
            .map_err(|_| IntakeError::invalid_url(raw, "cannot upgrade scheme"))?;
    }

    if parsed.host_str() != Some(host.as_str()) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| IntakeError::invalid_url(raw, e.to_string()))?;
    }

    if let Some(query) = parsed.query() {
        let kept = strip_tracking(query);
        parsed.set_query(if kept.is_empty() { None } else { Some(&kept) });
    }

    parsed.set_fragment(None);

    Ok(CanonicalUrl(parsed.to_string()))
}

/// True when `raw` canonicalizes.
pub fn is_valid_url(raw: &str) -> bool {
    canonicalize(raw).is_ok()
}

/// Drop tracking pairs, keeping the remaining raw segments in order.
fn strip_tracking(query: &str) -> String {
    query
        .split('&')
        .filter(|seg| !seg.is_empty())
        .filter(|seg| {
            let key = form_urlencoded::parse(seg.as_bytes())
                .next()
                .map(|(k, _)| k.into_owned())
                .unwrap_or_default();
            !is_tracking_param(&key)
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_tracking_param(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.starts_with("utm_") || TRACKING_PARAMS.contains(&lower.as_str())
}
