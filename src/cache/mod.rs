//! Cache module for storing fact values on disk
//!
//! Values are written as YAML files in the host's external facts directory (or
//! an explicit file) and treated as fresh while the file is younger than a TTL.
//! Expired, missing and corrupt entries all read as absent.

mod error;
mod host;
mod store;

pub use error::CacheError;
pub use host::{FactEnvironment, HostEnvironment, FALLBACK_FACTS_DIR};
pub use store::{CacheStore, CachedData, Lookup, DEFAULT_TTL_SECS};
