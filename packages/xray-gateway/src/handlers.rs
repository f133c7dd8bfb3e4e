//! HTTP request handlers.

use crate::bridge::{UserProvisioningRequest, UserRemovalRequest};
use crate::config_store::JSON_CONTENT_TYPE;
use crate::metrics::METRICS;
use crate::response::HealthResponse;
use crate::state::AppState;
use crate::Error;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

/// Health check with basic counters.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        requests: state.request_count.load(Ordering::Relaxed),
        ip_gating: state.gate.ip_gating_enabled(),
    })
}

/// Prometheus metrics in text exposition format.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.render(state.start_time.elapsed().as_secs()),
    )
}

/// `GET /config`: the stored document, verbatim.
pub async fn get_config(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let data = state.store.get().await.inspect_err(|e| {
        METRICS.config_io_errors.fetch_add(1, Ordering::Relaxed);
        error!(error = %e, "Failed to read config");
    })?;

    METRICS.config_reads.fetch_add(1, Ordering::Relaxed);
    info!(bytes = data.len(), "Config served");
    Ok(([(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], data))
}

/// `POST /config`: validate and replace the document.
pub async fn post_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    info!(bytes = body.len(), content_type = ?content_type, "Config update received");

    state
        .store
        .put(&body, content_type)
        .await
        .inspect_err(|e| match e {
            Error::NotWritable(_) => {
                METRICS.config_io_errors.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Failed to write config");
            }
            _ => {
                METRICS.config_rejected.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Config update rejected");
            }
        })?;

    METRICS.config_writes.fetch_add(1, Ordering::Relaxed);
    Ok(StatusCode::ACCEPTED)
}

/// `POST /xray-api/user`: add a user to an inbound.
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let request = UserProvisioningRequest::from_json(&body).inspect_err(|e| {
        warn!(error = %e, "Invalid add-user request");
    })?;

    let bridge = state.bridge.clone();
    run_detached(async move { bridge.add_user(&request).await }).await?;

    METRICS.users_added.fetch_add(1, Ordering::Relaxed);
    info!("User added");
    Ok(StatusCode::ACCEPTED)
}

/// `DELETE /xray-api/user`: remove a user from an inbound by email.
pub async fn remove_user(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let request = UserRemovalRequest::from_json(&body).inspect_err(|e| {
        warn!(error = %e, "Invalid remove-user request");
    })?;

    let bridge = state.bridge.clone();
    run_detached(async move {
        bridge
            .remove_user(&request.inbound_tag, &request.email)
            .await
    })
    .await?;

    METRICS.users_removed.fetch_add(1, Ordering::Relaxed);
    info!("User removed");
    Ok(StatusCode::ACCEPTED)
}

/// Run a bridge operation on its own task. The operation runs to completion
/// even if the inbound request is dropped while it is in flight.
async fn run_detached<F>(operation: F) -> Result<(), Error>
where
    F: Future<Output = Result<(), Error>> + Send + 'static,
{
    tokio::spawn(operation.in_current_span())
        .await
        .map_err(|e| Error::ProvisioningFailed(format!("provisioning task failed: {e}")))
        .and_then(|result| result)
        .inspect_err(record_provisioning_failure)
}

fn record_provisioning_failure(err: &Error) {
    match err {
        Error::ConnectFailed(_) => {
            METRICS.backend_connect_errors.fetch_add(1, Ordering::Relaxed);
        }
        _ => {
            METRICS.provisioning_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
    error!(error = %err, "Provisioning failed");
}
