//! Access gate and request correlation middleware.
//!
//! The gate is an ordered chain of independent predicates: source IP (when
//! an allow-list address is configured) and then bearer token. The first
//! predicate that denies short-circuits the request; the wrapped handler
//! never runs.

use crate::error::{Denial, Error};
use crate::metrics::METRICS;
use crate::state::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Credentials fixed at startup.
#[derive(Debug, Clone)]
pub struct AccessGate {
    token: String,
    allowed_ip: Option<IpAddr>,
}

impl AccessGate {
    pub fn new(token: impl Into<String>, allowed_ip: Option<IpAddr>) -> Self {
        Self {
            token: token.into(),
            allowed_ip,
        }
    }

    pub fn ip_gating_enabled(&self) -> bool {
        self.allowed_ip.is_some()
    }

    /// Host part of the peer address must equal the allow-listed address.
    /// Passes when IP gating is disabled; an unknown peer is denied.
    /// IPv4-mapped IPv6 peers (dual-stack listener) compare as IPv4.
    pub fn check_source(&self, peer: Option<SocketAddr>) -> Result<(), Denial> {
        let Some(allowed) = self.allowed_ip else {
            return Ok(());
        };
        match peer {
            Some(addr) if addr.ip().to_canonical() == allowed.to_canonical() => Ok(()),
            _ => Err(Denial::Ip),
        }
    }

    /// Requires `Authorization: Bearer <token>` exactly.
    /// Uses constant-time comparison to prevent timing attacks.
    pub fn check_bearer(&self, headers: &HeaderMap) -> Result<(), Denial> {
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "));

        match provided {
            Some(key)
                if key.len() == self.token.len()
                    && key.as_bytes().ct_eq(self.token.as_bytes()).into() =>
            {
                Ok(())
            }
            _ => Err(Denial::Token),
        }
    }
}

/// Reject requests whose source address is not allow-listed (403).
pub async fn ip_allowlist(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    match state.gate.check_source(peer) {
        Ok(()) => next.run(request).await,
        Err(denial) => {
            METRICS.denied_ip.fetch_add(1, Ordering::Relaxed);
            warn!(peer = ?peer, path = %request.uri().path(), "Source address not allowed");
            Error::AccessDenied(denial).into_response()
        }
    }
}

/// Reject requests without the configured bearer token (401).
pub async fn bearer_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match state.gate.check_bearer(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(denial) => {
            METRICS.denied_token.fetch_add(1, Ordering::Relaxed);
            warn!(path = %request.uri().path(), "Missing or invalid bearer token");
            Error::AccessDenied(denial).into_response()
        }
    }
}

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Caller-supplied ids longer than this are replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Tag every request with a correlation id. A usable id sent by the caller
/// is kept; otherwise a fresh `xgw-` id is minted. The id is echoed on the
/// response so callers can match gateway log lines to their own.
pub async fn inject_request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| usable_request_id(s))
        .map(str::to_owned)
        .unwrap_or_else(new_request_id);

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn usable_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id.bytes().all(|b| b.is_ascii_graphic())
}

fn new_request_id() -> String {
    use rand::Rng;
    format!("xgw-{:016x}", rand::thread_rng().gen::<u64>())
}

/// Request correlation ID, extractable from `Request::extensions()`.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);
