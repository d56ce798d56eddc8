//! Configuration types shared across the notifier workspace.
//!
//! ## Modules
//!
//! - [`duration`]: human-readable and legacy `hh:mm` duration parsing for
//!   `sender_timeout` / `resending_timeout`.

pub mod duration;

pub use duration::{deserialize_duration, HumanDuration};
