//! Runs a PDF transform and records the attempt in the history log
//!
//! The transform's result is what the caller sees. The history write that
//! follows it is best-effort: failures go to the error log and never change
//! the response.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use pdfdesk_core::PdfEditError;
use shared_types::{classify_source, NewHistoryEntry, OperationType, User};

use crate::error::ApiError;
use crate::state::AppState;

pub const SOURCE_TYPE_HEADER: &str = "x-source-type";

/// Proxy headers consulted for the client address, in priority order
const CLIENT_IP_HEADERS: [&str; 5] = [
    "x-forwarded-for",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http_client_ip",
    "http_x_forwarded_for",
];

/// Client context captured for the history log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub source_type: String,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            ip_address: client_ip(headers, peer),
            user_agent: header_str(header::USER_AGENT.as_str()).map(str::to_string),
            source_type: classify_source(header_str(SOURCE_TYPE_HEADER)),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_headers(&parts.headers, peer))
    }
}

/// First usable proxy header value, else the socket peer
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .map(|value| value.split(',').next().unwrap_or_default().trim())
        .find(|value| !value.is_empty() && !value.eq_ignore_ascii_case("unknown"))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Run CPU-bound work on the blocking pool
pub async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Worker task failed: {}", e)))
}

/// One audited operation: who asked, from where, and what for
pub struct Operation<'a> {
    pub state: &'a Arc<AppState>,
    pub actor: &'a User,
    pub meta: &'a RequestMeta,
    pub operation_type: OperationType,
    pub details: String,
}

impl Operation<'_> {
    /// Transform on the blocking pool, then record the attempt whatever the outcome
    pub async fn run<T, F>(self, transform: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Result<T, PdfEditError> + Send + 'static,
        T: Send + 'static,
    {
        let outcome = run_blocking(transform).await;
        match &outcome {
            Ok(Ok(_)) => tracing::info!(
                user_id = self.actor.id,
                operation = %self.operation_type,
                "PDF operation completed"
            ),
            Ok(Err(e)) => tracing::warn!(
                user_id = self.actor.id,
                operation = %self.operation_type,
                "PDF operation failed: {}",
                e
            ),
            Err(_) => {}
        }

        record(
            self.state,
            self.actor,
            self.meta,
            self.operation_type,
            self.details,
        )
        .await;

        outcome?.map_err(ApiError::from)
    }
}

/// Append a history entry; errors are logged and swallowed
pub async fn record(
    state: &Arc<AppState>,
    actor: &User,
    meta: &RequestMeta,
    operation_type: OperationType,
    details: String,
) {
    let (country, region) = match meta.ip_address.clone() {
        Some(ip) => {
            let geo = state.geo.clone();
            tokio::task::spawn_blocking(move || geo.resolve(&ip))
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Geo lookup task failed: {}", e);
                    (None, None)
                })
        }
        None => (None, None),
    };

    let mut entry = NewHistoryEntry::new(actor.id, operation_type, details);
    entry.source_type = meta.source_type.clone();
    entry.ip_address = meta.ip_address.clone();
    entry.user_agent = meta.user_agent.clone();
    entry.country = country;
    entry.state = region;

    match state.history.append(entry).await {
        Ok(saved) => tracing::debug!(
            history_id = saved.id,
            "Tracked {} by {}",
            operation_type,
            actor.email
        ),
        Err(e) => tracing::error!(
            user_id = actor.id,
            operation = %operation_type,
            "Failed to record operation history: {}",
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some("203.0.113.9:5123".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let h = headers(&[("x-forwarded-for", "198.51.100.7, 10.0.0.1")]);
        assert_eq!(client_ip(&h, peer()).as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn test_unknown_values_are_skipped() {
        let h = headers(&[
            ("x-forwarded-for", "unknown"),
            ("proxy-client-ip", ""),
            ("wl-proxy-client-ip", "192.0.2.44"),
        ]);
        assert_eq!(client_ip(&h, peer()).as_deref(), Some("192.0.2.44"));
    }

    #[test]
    fn test_falls_back_to_peer() {
        assert_eq!(
            client_ip(&HeaderMap::new(), peer()).as_deref(),
            Some("203.0.113.9")
        );
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_meta_captures_agent_and_source() {
        let h = headers(&[("user-agent", "curl/8.0"), ("x-source-type", "FRONTEND")]);
        let meta = RequestMeta::from_headers(&h, None);
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(meta.source_type, "FRONTEND");
        assert_eq!(meta.ip_address, None);
    }

    #[test]
    fn test_source_defaults_to_api() {
        let h = headers(&[("x-source-type", "  ")]);
        assert_eq!(RequestMeta::from_headers(&h, None).source_type, "API");
        assert_eq!(
            RequestMeta::from_headers(&HeaderMap::new(), None).source_type,
            "API"
        );
    }
}
