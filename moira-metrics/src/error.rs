//! Error types for metrics operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics system already initialized")]
    AlreadyInitialized,

    #[error("invalid metrics listen address {0:?}")]
    InvalidAddress(String),

    #[error("failed to bind prometheus exporter to {address}: {source}")]
    ExporterBind {
        address: String,
        #[source]
        source: metrics_exporter_prometheus::BuildError,
    },
}
