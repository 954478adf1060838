//! Client identity extraction for rate limiting.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Returns the client IP used as the rate-limit key.
///
/// With `behind_proxy` set, the left-most address of `X-Forwarded-For` wins,
/// then `X-Real-IP`. Anything missing or unparsable falls back to the socket
/// peer address, so a client can never end up without a key.
///
/// Only enable `behind_proxy` when a trusted reverse proxy overwrites these
/// headers; otherwise clients can pick their own bucket.
///
/// # Examples
///
/// ```ignore
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
///
/// let ip = client_ip(&headers, "10.0.0.1:5000".parse().unwrap(), true);
/// assert_eq!(ip.to_string(), "203.0.113.7");
/// ```
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> IpAddr {
    if behind_proxy {
        let forwarded = header_str(headers, X_FORWARDED_FOR)
            .and_then(|value| value.split(',').next())
            .and_then(parse_ip);

        if let Some(ip) = forwarded.or_else(|| header_str(headers, X_REAL_IP).and_then(parse_ip))
        {
            return ip;
        }
    }

    peer.ip()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();

    // Some proxies append the port, and IPv6 then comes bracketed.
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}
