//! Error types for schedule evaluation, throttling, and event processing.

use thiserror::Error;

/// Failures from [`crate::schedule::next_allowed`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// The weekday mask is neither empty (always-allow) nor length 7.
    #[error("schedule weekday mask has invalid length {0} (expected 0 or 7)")]
    InvalidMaskLength(usize),

    /// No day in the next eight days has an allowed delivery window. Callers
    /// keep the unadjusted `base` timestamp and log this rather than fail
    /// the whole event (§4.2 step 7).
    #[error("no allowed delivery window found within the next eight days")]
    NoAllowedWindow,
}

/// Errors from [`crate::event_processor::process`].
///
/// Only trigger, tag, and subscription-union load failures are fatal for an
/// event (§4.3); contact-load and tag-mismatch failures are logged and
/// skipped at the call site rather than raised here.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("event has empty trigger id")]
    EmptyTriggerId,

    #[error(transparent)]
    Store(#[from] moira_store::StoreError),
}
