//! The assembled notification engine binary: configuration loading and the
//! top-level wiring of store, notifier, and sender pool.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod controller;
