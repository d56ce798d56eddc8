//! Error types for the store adapter.

use thiserror::Error;

/// Errors a `Store` implementation can return.
///
/// All of these are "transient store" or "malformed data" kinds in the
/// ambient error taxonomy: callers log and continue rather than treat them
/// as fatal, except where a specific operation's contract says otherwise
/// (trigger/tag/subscription loads during event processing are the
/// exception — those are propagated).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the requested id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A trigger's tag set was requested but came back empty.
    #[error("trigger {0} has no tags")]
    EmptyTags(String),

    /// A stored value failed to deserialize back into its model type.
    #[error("malformed {kind} record for {id}: {source}")]
    Malformed {
        kind: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// An internal lock was poisoned by a panicking holder.
    #[error("internal store error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("lock poisoned: {e}"))
    }
}
