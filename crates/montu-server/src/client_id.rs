//! Client identifiers for rate limiting.

use axum::http::HeaderMap;

/// Identifier shared by every request that carries no forwarding header.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Proxy headers consulted in priority order.
const FORWARDING_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// Derive the rate-limit key for a request from its proxy headers.
///
/// `x-forwarded-for` may hold a chain; its first (client-most) address wins.
/// Requests without any usable header all share [`UNKNOWN_CLIENT`].
pub fn client_identifier(headers: &HeaderMap) -> String {
    FORWARDING_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
