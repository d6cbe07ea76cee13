//! Storage adapters that live inside the domain crate.
//!
//! The registry has no persistence, so the in-memory adapter is the one the
//! server runs with, not just a test double.

pub mod memory_repo;
