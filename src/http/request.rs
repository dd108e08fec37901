//! Request identification.
//!
//! # Responsibilities
//! - Generate a UUID request ID when the caller sent none
//! - Resolve the client address used to key security events
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `X-Forwarded-For` is honored only when the TCP peer is a configured
//!   trusted proxy; its first hop then names the client. Anyone else is
//!   keyed on the peer address, so a forged header cannot pin events (and
//!   auto-blocks) on somebody else's address

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::server::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Per-request facts every handler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: IpAddr,
    /// Address of the TCP peer, ignoring forwarding headers.
    pub peer_ip: IpAddr,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer_ip = peer_ip(&parts.extensions);
        Ok(Self {
            request_id: request_id(&parts.headers),
            client_ip: client_ip(&parts.headers, peer_ip, &state.trusted_proxies),
            peer_ip,
        })
    }
}

pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

pub fn peer_ip(extensions: &axum::http::Extensions) -> IpAddr {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// First parseable `X-Forwarded-For` entry when `peer` is a trusted proxy,
/// else the peer address.
pub fn client_ip(headers: &HeaderMap, peer: IpAddr, trusted_proxies: &[IpAddr]) -> IpAddr {
    let peer = peer.to_canonical();
    if !trusted_proxies.contains(&peer) {
        return peer;
    }
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .unwrap_or(peer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trusted_proxy_forwards_first_hop() {
        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        let trusted = [peer];
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, peer, &trusted), peer);

        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("203.0.113.5, 10.0.0.1"));
        assert_eq!(client_ip(&headers, peer, &trusted), "203.0.113.5".parse::<IpAddr>().unwrap());

        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("garbage"));
        assert_eq!(client_ip(&headers, peer, &trusted), peer);
    }

    #[test]
    fn test_untrusted_peer_cannot_forward() {
        let peer: IpAddr = "198.51.100.20".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("203.0.113.5"));

        assert_eq!(client_ip(&headers, peer, &[]), peer);
        assert_eq!(client_ip(&headers, peer, &["127.0.0.1".parse::<IpAddr>().unwrap()]), peer);
    }

    #[test]
    fn test_mapped_ipv4_peer_matches_trusted_proxy() {
        let peer: IpAddr = "::ffff:127.0.0.1".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("203.0.113.5"));

        let forwarded = client_ip(&headers, peer, &["127.0.0.1".parse::<IpAddr>().unwrap()]);
        assert_eq!(forwarded, "203.0.113.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_request_ids_are_uuids() {
        let request = Request::new(());
        let id = MakeRequestUuid.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
