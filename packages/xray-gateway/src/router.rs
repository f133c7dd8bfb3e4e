//! HTTP router setup.
//!
//! Layer order matters: for the gated routes the IP allow-list (when
//! enabled) wraps the bearer check, so a request from a foreign address is
//! rejected with 403 before its token is looked at.

use crate::handlers;
use crate::middleware::{bearer_auth, inject_request_id, ip_allowlist, RequestId};
use crate::state::AppState;
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create(state: Arc<AppState>) -> Router {
    let mut config_routes = Router::new()
        .route("/config", get(handlers::get_config).post(handlers::post_config))
        .route_layer(from_fn_with_state(state.clone(), bearer_auth))
        // Documents grow with the client list; no cap on their size.
        .layer(DefaultBodyLimit::disable());
    if state.gate.ip_gating_enabled() {
        config_routes =
            config_routes.route_layer(from_fn_with_state(state.clone(), ip_allowlist));
    }

    let user_routes = Router::new()
        .route(
            "/xray-api/user",
            post(handlers::add_user).delete(handlers::remove_user),
        )
        .route_layer(from_fn_with_state(state.clone(), bearer_auth));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .merge(config_routes)
        .merge(user_routes)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(inject_request_id))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let req_id = request
                        .extensions()
                        .get::<RequestId>()
                        .map(|r| r.0.as_str())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        req_id = %req_id,
                    )
                })),
        )
        .with_state(state)
}
