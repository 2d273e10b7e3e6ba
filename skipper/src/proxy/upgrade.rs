//! HTTP Upgrade (`Connection: Upgrade`, e.g. WebSocket) support, gated by
//! `Config::experimental_upgrade` (spec.md §4.7 edge case).
//!
//! pingora-proxy already does the bidirectional byte-pipe copy once a
//! request carrying `Connection: Upgrade` reaches an upstream that answers
//! `101 Switching Protocols` - our only job is to not strip the headers
//! that negotiate it, which the hop-by-hop stripping pass would otherwise
//! do unconditionally.

use http::HeaderMap;

/// True if `headers` carries `Connection: Upgrade` (case-insensitively,
/// among any other connection tokens).
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tok| tok.trim().eq_ignore_ascii_case("upgrade")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_connection_upgrade() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONNECTION, "Upgrade".parse().unwrap());
        assert!(is_upgrade_request(&headers));
    }

    #[test]
    fn ignores_unrelated_connection_values() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONNECTION, "keep-alive".parse().unwrap());
        assert!(!is_upgrade_request(&headers));
    }
}
