//! Shared types, configuration, error plumbing, and ambient infrastructure for
//! the Moira notifier.
//!
//! This crate has no business logic of its own; it is the vocabulary every
//! other `moira-*` crate speaks: the data model, the `Clock` capability used
//! to keep time injectable, and the logging/config conventions shared across
//! the workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod traits;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ConfigError;
pub use model::{
    Contact, Event, NotificationPackage, Schedule, ScheduledNotification, State, Subscription,
    Trigger,
};
pub use tracing;

/// Broadcast to every long-running loop to request a graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
