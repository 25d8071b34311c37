//! Error Code Mapping
//!
//! Maps fetch-service error codes (e.g. `ERR::PROXY::POOL_UNAVAILABLE`) to a
//! `TransportKind`. Matching is by token, so new codes in a known family are
//! classified without changes here.

use crate::outcome::TransportKind;

/// Classifies a service error code. Unmatched codes are `Unknown`.
///
/// Families are checked in a fixed order: a code such as `ERR::PROXY::TIMEOUT`
/// is a proxy failure, and `ERR::SCRAPE::DRIVER_TIMEOUT` is a driver failure.
pub fn classify_code(code: &str) -> TransportKind {
    let upper = code.to_ascii_uppercase();
    let has = |token: &str| upper.contains(token);

    if has("PROXY") {
        TransportKind::Proxy
    } else if has("DRIVER") || has("BROWSER") {
        TransportKind::Driver
    } else if has("RENDER") || has("JAVASCRIPT") || has("SCREENSHOT") {
        TransportKind::Render
    } else if has("TIMEOUT") || has("TIMED_OUT") {
        TransportKind::Timeout
    } else {
        TransportKind::Unknown
    }
}

/// Returns a recovery hint for the given kind.
pub fn hint_for_kind(kind: TransportKind) -> &'static str {
    match kind {
        TransportKind::Timeout => "Increase timeout or render wait",
        TransportKind::Proxy => "Retry with a fresh or warmed proxy session",
        TransportKind::Render => "Retry with a longer render wait or without selector wait",
        TransportKind::Driver => "Retry later; the rendering driver crashed or stalled",
        TransportKind::Unknown => "Inspect the service error code; not retried",
    }
}
