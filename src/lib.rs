//! factcache library
//!
//! A disk-backed YAML cache with TTL expiry for external fact gathering. The
//! `cli` module is exposed for use in integration tests.

pub mod cache;
pub mod cli;

pub use cache::{CacheError, CacheStore, FactEnvironment, HostEnvironment, Lookup};
