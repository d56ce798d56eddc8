//! Error types shared across the `moira-*` crates.
//!
//! Each crate that needs its own failure modes defines its own `thiserror`
//! enum (store errors, notifier errors, sender errors); this module only
//! holds the configuration error type, since config loading is shared
//! infrastructure rather than any one component's concern.

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file's contents could not be parsed.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A required field was missing or empty.
    #[error("missing required configuration field: {0}")]
    MissingField(&'static str),

    /// A self-state admin contact refers to a sender type that isn't registered.
    #[error("self-state admin contact uses unregistered sender type: {0}")]
    UnknownAdminContactType(String),
}
