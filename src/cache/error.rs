//! Error types for cache operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, reading or writing a cache entry
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key cannot be used as a file name in the facts directory
    #[error("Invalid cache key: '{0}'")]
    InvalidKey(String),

    /// Reading or writing the cache file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not valid YAML
    #[error("Cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The cache file parsed but holds no entry under the requested key
    #[error("No entry for '{key}' in {}", path.display())]
    MissingEntry { path: PathBuf, key: String },

    /// The value could not be serialized to YAML
    #[error("Cannot serialize value: {0}")]
    Serialize(#[source] serde_yaml::Error),
}
