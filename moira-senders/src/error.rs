//! Error type for sender registration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SenderError {
    /// Two configured senders resolved to the same channel key (contact
    /// type, or script sender name).
    #[error("duplicate sender registration for channel key {0:?}")]
    DuplicateChannelKey(String),

    /// A sender's `init` rejected its configuration.
    #[error(transparent)]
    Config(#[from] moira_common::ConfigError),
}
