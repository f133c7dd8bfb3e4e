//! Xray Gateway binary.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xray_gateway::{create_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Xray Gateway");

    // Missing mandatory values are fatal before anything is served.
    let state = match Config::load().and_then(|config| AppState::new(&config)) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!(error = %e, "FATAL: Config error, fix env vars or gateway.toml");
            std::process::exit(1);
        }
    };

    if state.gate.ip_gating_enabled() {
        info!("IP allow-list enabled for /config");
    } else {
        warn!("ALLOWED_IP not set: /config is reachable from any address");
    }

    let bind_address = state.settings.bind_address.clone();
    let app = create_router(state);

    info!(address = %bind_address, "Listening");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Gateway shut down gracefully");
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM. A handler that cannot be
/// installed is logged and treated as a signal that never arrives.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    info!(signal = received, "Stopping; draining in-flight requests");
}
