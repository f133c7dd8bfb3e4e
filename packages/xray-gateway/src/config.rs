//! Gateway configuration.
//!
//! Loaded once at startup from an optional `gateway.{toml,yaml,json}` file
//! and the process environment (after `.env`, if present). Variable names
//! map to fields case-insensitively, e.g. `XRAY_CONFIG_DIR` ->
//! `xray_config_dir`.

use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;

/// Raw configuration as read from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the Xray config document.
    #[serde(default)]
    pub xray_config_dir: String,

    #[serde(default = "defaults::xray_config_file")]
    pub xray_config_file: String,

    /// Backend endpoint, `host:port` or a full URI. Takes precedence over
    /// `xray_api_host` + `xray_api_port`.
    #[serde(default)]
    pub xray_api_addr: Option<String>,

    #[serde(default)]
    pub xray_api_host: Option<String>,

    #[serde(default)]
    pub xray_api_port: Option<String>,

    /// Shared bearer token.
    #[serde(default)]
    pub api_token: String,

    /// Single allow-listed source address. Unset or empty disables IP gating.
    #[serde(default)]
    pub allowed_ip: Option<String>,

    #[serde(default = "defaults::bind_host")]
    pub bind_host: String,

    #[serde(default = "defaults::internal_server_port")]
    pub internal_server_port: u16,
}

/// Configuration after validation: every value the core needs, resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub backend_uri: String,
    pub api_token: String,
    pub allowed_ip: Option<IpAddr>,
    pub bind_address: String,
}

impl Config {
    /// Load from `.env`, the optional `gateway` file and the environment.
    pub fn load() -> Result<Self, crate::Error> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        let builder = config::Config::builder()
            .add_source(config::File::with_name("gateway").required(false))
            .add_source(config::Environment::default());
        Self::from_builder(builder)
    }

    /// Deserialize from an assembled `config` builder.
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, crate::Error> {
        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| crate::Error::Config(format!("Failed to load configuration: {e}")))
    }

    /// Check mandatory values and resolve derived ones.
    pub fn validate(&self) -> Result<Settings, crate::Error> {
        if self.xray_config_dir.trim().is_empty() {
            return Err(crate::Error::Config("XRAY_CONFIG_DIR is not set".into()));
        }
        if self.xray_config_file.trim().is_empty() {
            return Err(crate::Error::Config("XRAY_CONFIG_FILE is empty".into()));
        }
        if self.api_token.is_empty() {
            return Err(crate::Error::Config("API_TOKEN is not set".into()));
        }

        let allowed_ip = match non_empty(&self.allowed_ip) {
            Some(raw) => Some(raw.trim().parse::<IpAddr>().map_err(|e| {
                crate::Error::Config(format!("ALLOWED_IP {raw:?} is not an IP address: {e}"))
            })?),
            None => None,
        };

        Ok(Settings {
            config_path: PathBuf::from(&self.xray_config_dir).join(&self.xray_config_file),
            backend_uri: self.backend_uri()?,
            api_token: self.api_token.clone(),
            allowed_ip,
            bind_address: format!("{}:{}", self.bind_host, self.internal_server_port),
        })
    }

    fn backend_uri(&self) -> Result<String, crate::Error> {
        let addr = match (
            non_empty(&self.xray_api_addr),
            non_empty(&self.xray_api_host),
            non_empty(&self.xray_api_port),
        ) {
            (Some(addr), _, _) => addr.trim().to_string(),
            (None, Some(host), Some(port)) => format!("{}:{}", host.trim(), port.trim()),
            _ => {
                return Err(crate::Error::Config(
                    "XRAY_API_ADDR (or XRAY_API_HOST and XRAY_API_PORT) is not set".into(),
                ))
            }
        };
        if addr.contains("://") {
            Ok(addr)
        } else {
            Ok(format!("http://{addr}"))
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

mod defaults {
    pub fn xray_config_file() -> String {
        "config.json".into()
    }

    pub fn bind_host() -> String {
        "0.0.0.0".into()
    }

    pub fn internal_server_port() -> u16 {
        8080
    }
}
