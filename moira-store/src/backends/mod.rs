//! `Store` backend implementations.
//!
//! - `memory`: the only backend today. Redis-shaped by contract, in-process
//!   by implementation.

pub mod memory;

pub use memory::InMemoryStore;
