//! Helpers for pulling visitor information out of HTTP requests.

use axum::http::{HeaderMap, header};
use std::net::{IpAddr, SocketAddr};

use crate::domain::attributes::RequestHeaders;

/// Copies every header with a UTF-8 value into a [`RequestHeaders`] map.
///
/// Repeated headers keep their last value.
pub fn collect_headers(headers: &HeaderMap) -> RequestHeaders {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect()
}

pub fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
}

pub fn referrer(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::REFERER).and_then(|v| v.to_str().ok())
}

/// Best guess at the visitor's IP address.
///
/// Uses the first valid entry of `X-Forwarded-For`, then `X-Real-IP`, then the
/// socket peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .and_then(|v| v.parse::<IpAddr>().ok());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    forwarded
        .or_else(real_ip)
        .or_else(|| peer.map(|addr| addr.ip()))
        .map(|ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_collect_headers_lowercases_names() {
        let mut headers = HeaderMap::new();
        headers.insert("CF-IPCountry", HeaderValue::from_static("DE"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("de-DE"));

        let collected = collect_headers(&headers);

        assert_eq!(collected.get("cf-ipcountry"), Some("DE"));
        assert_eq!(collected.get("Accept-Language"), Some("de-DE"));
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(
            client_ip(&headers, Some(peer)).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn test_client_ip_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers, None).as_deref(), Some("198.51.100.2"));

        let peer: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!(
            client_ip(&HeaderMap::new(), Some(peer)).as_deref(),
            Some("::1")
        );
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_user_agent_and_referrer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://a.example"));

        assert_eq!(user_agent(&headers), Some("curl/8.0"));
        assert_eq!(referrer(&headers), Some("https://a.example"));
        assert_eq!(user_agent(&HeaderMap::new()), None);
    }
}
