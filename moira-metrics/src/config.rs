//! Metrics configuration.

use serde::Deserialize;

/// Configuration for in-process metrics collection and the Prometheus
/// scrape endpoint that exposes them.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Enable or disable metrics collection. When disabled, `init_metrics`
    /// is a no-op and every recorder call becomes a cheap no-op too.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Address the Prometheus exporter binds its scrape endpoint to, e.g.
    /// `"0.0.0.0:9090"`.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

const fn default_enabled() -> bool {
    true
}

fn default_listen_address() -> String {
    "0.0.0.0:9090".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            listen_address: default_listen_address(),
        }
    }
}
