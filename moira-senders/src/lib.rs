//! Sender registration and the per-channel worker pool (§4.5).
//!
//! The `Sender` contract itself lives in `moira_common::traits`; this crate
//! owns turning a list of configured senders into running worker loops and
//! the channel map the dispatcher routes packages through.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod log_sender;
pub mod registry;

pub use config::SenderConfig;
pub use error::SenderError;
pub use log_sender::LogSender;
pub use registry::SenderPool;
