//! Prometheus metrics (lock-free atomics, zero allocation on hot path).

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    // --- Access gate ---
    pub denied_ip: AtomicU64,
    pub denied_token: AtomicU64,

    // --- Config document ---
    pub config_reads: AtomicU64,
    pub config_writes: AtomicU64,
    pub config_rejected: AtomicU64,
    pub config_io_errors: AtomicU64,

    // --- Provisioning ---
    pub users_added: AtomicU64,
    pub users_removed: AtomicU64,
    pub backend_connect_errors: AtomicU64,
    pub provisioning_errors: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            denied_ip: AtomicU64::new(0),
            denied_token: AtomicU64::new(0),
            config_reads: AtomicU64::new(0),
            config_writes: AtomicU64::new(0),
            config_rejected: AtomicU64::new(0),
            config_io_errors: AtomicU64::new(0),
            users_added: AtomicU64::new(0),
            users_removed: AtomicU64::new(0),
            backend_connect_errors: AtomicU64::new(0),
            provisioning_errors: AtomicU64::new(0),
        }
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, uptime_secs: u64) -> String {
        let counters = [
            (
                "gateway_denied_total",
                "Requests rejected by the access gate",
                Some(("reason", "ip")),
                &self.denied_ip,
            ),
            (
                "gateway_denied_total",
                "Requests rejected by the access gate",
                Some(("reason", "token")),
                &self.denied_token,
            ),
            (
                "gateway_config_reads_total",
                "Config documents served",
                None,
                &self.config_reads,
            ),
            (
                "gateway_config_writes_total",
                "Config documents written",
                None,
                &self.config_writes,
            ),
            (
                "gateway_config_rejected_total",
                "Config writes rejected by validation",
                None,
                &self.config_rejected,
            ),
            (
                "gateway_config_io_errors_total",
                "Config storage read/write failures",
                None,
                &self.config_io_errors,
            ),
            (
                "gateway_users_added_total",
                "Users added to an inbound",
                None,
                &self.users_added,
            ),
            (
                "gateway_users_removed_total",
                "Users removed from an inbound",
                None,
                &self.users_removed,
            ),
            (
                "gateway_backend_connect_errors_total",
                "Failed connections to the backend management service",
                None,
                &self.backend_connect_errors,
            ),
            (
                "gateway_provisioning_errors_total",
                "Backend provisioning operations that failed",
                None,
                &self.provisioning_errors,
            ),
        ];

        let mut out = String::with_capacity(2048);
        let mut last_name = "";
        for (name, help, label, value) in counters {
            if name != last_name {
                out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} counter\n"));
                last_name = name;
            }
            let value = value.load(Ordering::Relaxed);
            match label {
                Some((k, v)) => out.push_str(&format!("{name}{{{k}=\"{v}\"}} {value}\n")),
                None => out.push_str(&format!("{name} {value}\n")),
            }
        }
        out.push_str(&format!(
            "# HELP gateway_uptime_seconds Seconds since start\n# TYPE gateway_uptime_seconds gauge\ngateway_uptime_seconds {uptime_secs}\n"
        ));
        out
    }
}
