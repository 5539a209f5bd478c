//! Host environment queried for the default cache directory
//!
//! The store never reads global state to decide where cache files live. It asks a
//! [`FactEnvironment`] handed to it at construction, so tests can supply a fake.

use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Directory used when the host has no external facts support
pub const FALLBACK_FACTS_DIR: &str = "/etc/facter/facts.d";

/// Queries the cache store makes against the host fact-resolution environment
pub trait FactEnvironment {
    /// Whether the host reads facts from an externally configured directory
    fn supports_external_facts(&self) -> bool;

    /// The first directory on the host's external facts search path
    fn default_search_directory(&self) -> PathBuf;
}

/// A host environment described by its external facts search path
///
/// External facts are supported when the search path is non-empty; the first
/// entry is then the default directory for cache files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnvironment {
    search_path: Vec<PathBuf>,
}

impl HostEnvironment {
    /// Creates an environment with the given external facts search path
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// Creates an environment whose only external facts directory is `dir`
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(vec![dir.into()])
    }

    /// Creates an environment without external facts support
    pub fn without_external_facts() -> Self {
        Self::default()
    }

    /// Derives the environment for the user running the process
    ///
    /// Root uses the system facts directory. Other users get `~/.facter/facts.d`,
    /// falling back to the system directory when no home directory is known.
    pub fn for_current_user() -> Self {
        if is_root() {
            return Self::with_dir(FALLBACK_FACTS_DIR);
        }
        match BaseDirs::new() {
            Some(dirs) => Self::with_dir(user_facts_dir(dirs.home_dir())),
            None => Self::without_external_facts(),
        }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }
}

impl FactEnvironment for HostEnvironment {
    fn supports_external_facts(&self) -> bool {
        !self.search_path.is_empty()
    }

    fn default_search_directory(&self) -> PathBuf {
        self.search_path
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from(FALLBACK_FACTS_DIR))
    }
}

fn user_facts_dir(home: &Path) -> PathBuf {
    home.join(".facter").join("facts.d")
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}
