//! # Xray Gateway
//!
//! A small admin gateway in front of an Xray proxy. Reads and replaces the
//! proxy's JSON config file and provisions users through Xray's gRPC
//! `HandlerService`, all behind a bearer token and an optional IP allow-list.
//!
//! ## Quick Start
//! ```bash
//! XRAY_CONFIG_DIR=/etc/xray XRAY_API_ADDR=xray:10085 API_TOKEN=secret \
//!     cargo run --bin xray-gateway
//! ```
//!
//! ## Endpoints
//! - `GET /config` - Current config document
//! - `POST /config` - Replace config document (`application/json`)
//! - `POST /xray-api/user` - Add a user to an inbound
//! - `DELETE /xray-api/user` - Remove a user from an inbound
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus counters

pub mod bridge;
pub mod config;
pub mod config_store;
mod error;
mod handlers;
pub mod metrics;
pub mod middleware;
pub mod proto;
mod response;
mod router;
mod state;

pub use config::Config;
pub use error::{Denial, Error, InvalidRequest};
pub use router::create as create_router;
pub use state::AppState;
