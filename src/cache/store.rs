//! Cache store for persisting fact values to disk
//!
//! Provides a `CacheStore` that keeps one YAML file per key and judges freshness
//! by the file's modification time, so an external fact-gathering tool can skip
//! recomputing a value it produced within the last TTL seconds.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::CacheError;
use super::host::{FactEnvironment, HostEnvironment, FALLBACK_FACTS_DIR};

/// Default time-to-live in seconds (one hour)
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Extension of cache files placed in the facts directory
const CACHE_EXTENSION: &str = "yaml";

/// A fresh value read from the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// Last modification time of the cache file
    pub cached_at: DateTime<Utc>,
    /// How old the entry was when it was read
    pub age: Duration,
}

/// Outcome of a cache lookup
///
/// Everything other than `Hit` means the caller has no usable value and should
/// recompute it.
#[derive(Debug)]
pub enum Lookup<T> {
    /// The entry exists, parsed, and is within its TTL
    Hit(CachedData<T>),
    /// No cache file exists at the resolved path
    Missing,
    /// The entry is older than the TTL
    Expired {
        cached_at: DateTime<Utc>,
        age: Duration,
    },
    /// The entry could not be read or parsed
    Failed(CacheError),
}

impl<T> Lookup<T> {
    /// Returns the value on a hit, `None` for every form of absence
    pub fn into_value(self) -> Option<T> {
        match self {
            Lookup::Hit(cached) => Some(cached.data),
            _ => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

/// Reads and writes cached fact values on disk
///
/// Each key maps to `<facts dir>/<key>.yaml` unless the caller names an explicit
/// file. The file holds a single-entry mapping `{key: value}`. Nothing is kept in
/// memory between calls and the facts directory is never created; callers must
/// make sure it exists before writing.
#[derive(Debug, Clone)]
pub struct CacheStore<E = HostEnvironment> {
    env: E,
}

impl CacheStore<HostEnvironment> {
    /// Creates a store using the facts directory of the current user
    pub fn for_current_user() -> Self {
        Self::new(HostEnvironment::for_current_user())
    }
}

impl<E: FactEnvironment> CacheStore<E> {
    pub fn new(env: E) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Returns the cache file for `key`
    ///
    /// An explicit `source` is used verbatim and the key plays no part in the
    /// path. Otherwise the file is `<dir>/<key>.yaml`, where `<dir>` is the
    /// host's external facts directory if it supports external facts, or
    /// `/etc/facter/facts.d` if not. Never touches the filesystem.
    pub fn resolve_path(&self, key: &str, source: Option<&Path>) -> Result<PathBuf, CacheError> {
        if let Some(source) = source {
            return Ok(source.to_path_buf());
        }
        validate_key(key)?;

        let dir = if self.env.supports_external_facts() {
            self.env.default_search_directory()
        } else {
            PathBuf::from(FALLBACK_FACTS_DIR)
        };
        Ok(dir.join(format!("{}.{}", key, CACHE_EXTENSION)))
    }

    /// Looks up `key`, returning its value only if the entry is younger than `ttl_secs`
    ///
    /// A TTL of zero is never fresh. Failures are logged at debug level and
    /// reported as `Lookup::Failed`; stale or corrupt files are left in place.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl_secs: u64,
        source: Option<&Path>,
    ) -> Lookup<T> {
        let path = match self.resolve_path(key, source) {
            Ok(path) => path,
            Err(err) => return failed(key, err),
        };

        let modified = match fs::metadata(&path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(key, path = %path.display(), "cache miss");
                return Lookup::Missing;
            }
            Err(source) => return failed(key, CacheError::Io { path, source }),
        };

        let cached_at: DateTime<Utc> = modified.into();
        // A modification time in the future counts as brand new.
        let age = (Utc::now() - cached_at).max(Duration::zero());
        if !is_fresh(age, ttl_secs) {
            debug!(key, path = %path.display(), age_secs = age.num_seconds(), ttl_secs, "cache entry expired");
            return Lookup::Expired { cached_at, age };
        }

        match read_entry(&path, key) {
            Ok(data) => Lookup::Hit(CachedData {
                data,
                cached_at,
                age,
            }),
            Err(err) => failed(key, err),
        }
    }

    /// Writes `value` under `key`, replacing any previous file at the resolved path
    ///
    /// # Returns
    /// * `Ok(path)` with the file that was written
    /// * `Err` if the key is invalid, serialization fails, or the file cannot be written
    pub fn put<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        source: Option<&Path>,
    ) -> Result<PathBuf, CacheError> {
        let path = self.resolve_path(key, source)?;

        let mut entry = Mapping::new();
        entry.insert(
            Value::String(key.to_string()),
            serde_yaml::to_value(value).map_err(CacheError::Serialize)?,
        );
        let yaml = serde_yaml::to_string(&entry).map_err(CacheError::Serialize)?;

        fs::write(&path, yaml).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(key, path = %path.display(), "cache entry written");
        Ok(path)
    }

    /// Like [`get`](Self::get), collapsing every kind of absence into `None`
    pub fn cached<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl_secs: u64,
        source: Option<&Path>,
    ) -> Option<T> {
        self.get(key, ttl_secs, source).into_value()
    }

    /// Like [`put`](Self::put), but logs a failure instead of returning it
    ///
    /// Returns whether the value reached disk.
    pub fn cache<T: Serialize + ?Sized>(&self, key: &str, value: &T, source: Option<&Path>) -> bool {
        match self.put(key, value, source) {
            Ok(_) => true,
            Err(err) => {
                debug!(key, error = %err, "cache write failed");
                false
            }
        }
    }
}

fn failed<T>(key: &str, err: CacheError) -> Lookup<T> {
    debug!(key, error = %err, "cache read failed");
    Lookup::Failed(err)
}

fn is_fresh(age: Duration, ttl_secs: u64) -> bool {
    if ttl_secs == 0 {
        return false;
    }
    match i64::try_from(ttl_secs).ok().and_then(Duration::try_seconds) {
        Some(ttl) => age <= ttl,
        // Larger than any representable age.
        None => true,
    }
}

fn read_entry<T: DeserializeOwned>(path: &Path, key: &str) -> Result<T, CacheError> {
    let contents = fs::read_to_string(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |source| CacheError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut entry: Mapping = serde_yaml::from_str(&contents).map_err(parse_err)?;
    let value = entry
        .remove(key)
        .ok_or_else(|| CacheError::MissingEntry {
            path: path.to_path_buf(),
            key: key.to_string(),
        })?;
    serde_yaml::from_value(value).map_err(parse_err)
}

/// Keys name a file inside the facts directory, so they must be a single path component
fn validate_key(key: &str) -> Result<(), CacheError> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0']);
    if invalid {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
