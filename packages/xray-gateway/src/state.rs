//! Application state shared across handlers.

use crate::bridge::{Connector, GrpcConnector, ProvisioningBridge};
use crate::config::{Config, Settings};
use crate::config_store::ConfigStore;
use crate::middleware::AccessGate;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared application state. Everything except the counters is fixed at
/// startup.
pub struct AppState {
    pub settings: Settings,
    pub gate: AccessGate,
    pub store: ConfigStore,
    pub bridge: ProvisioningBridge,
    pub start_time: Instant,
    pub request_count: AtomicU64,
}

impl AppState {
    /// Validate configuration and build state with the gRPC connector.
    pub fn new(config: &Config) -> Result<Self, crate::Error> {
        let settings = config.validate()?;
        let connector = GrpcConnector::new(&settings.backend_uri)?;
        Ok(Self::with_connector(settings, Arc::new(connector)))
    }

    /// Build state around an arbitrary backend connector.
    pub fn with_connector(settings: Settings, connector: Arc<dyn Connector>) -> Self {
        info!(
            config_path = %settings.config_path.display(),
            backend = %connector.endpoint(),
            ip_gating = settings.allowed_ip.is_some(),
            "Gateway state initialized"
        );
        Self {
            gate: AccessGate::new(settings.api_token.clone(), settings.allowed_ip),
            store: ConfigStore::new(settings.config_path.clone()),
            bridge: ProvisioningBridge::new(connector),
            settings,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }
}
