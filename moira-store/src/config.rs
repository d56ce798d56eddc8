//! Store configuration.
//!
//! The abstract contract (§6) is written against a Redis-like endpoint;
//! this workspace ships a single in-process implementation of it, so
//! `endpoint` is accepted and validated but otherwise unused today — kept
//! so a real Redis-backed `Store` can be dropped in behind this config
//! shape later without a breaking change to the top-level config file.

use serde::Deserialize;

use crate::backends::InMemoryStore;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store connection string, e.g. `"redis://localhost:6379"`.
    pub endpoint: String,
}

impl StoreConfig {
    /// Build the store this configuration describes.
    ///
    /// Always an [`InMemoryStore`] today; `endpoint` is not yet dialed.
    #[must_use]
    pub fn build(&self) -> InMemoryStore {
        InMemoryStore::new()
    }
}
