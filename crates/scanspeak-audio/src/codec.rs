//! Recorder encoding negotiation.

use tracing::{debug, warn};

/// First candidate the platform reports as supported, or `""` (let the
/// recorder choose its default) when none are.
///
/// `query` returns `None` when the platform cannot answer; that counts as
/// "not supported" for the candidate.
pub fn pick_supported_encoding<S, F>(candidates: &[S], query: F) -> String
where
    S: AsRef<str>,
    F: Fn(&str) -> Option<bool>,
{
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if query(candidate) == Some(true) {
            debug!(encoding = candidate, "Negotiated recording encoding");
            return candidate.to_string();
        }
    }
    warn!("No candidate encoding supported; using recorder default");
    String::new()
}

/// Every candidate the platform reports as supported, in preference order.
pub fn supported_encodings<S, F>(candidates: &[S], query: F) -> Vec<String>
where
    S: AsRef<str>,
    F: Fn(&str) -> Option<bool>,
{
    candidates
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| query(*c) == Some(true))
        .map(str::to_string)
        .collect()
}
