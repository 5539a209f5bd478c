//! Command-line interface for factcache
//!
//! This module handles parsing of CLI arguments using clap and running the
//! `get`, `put` and `path` subcommands against a [`CacheStore`].

use std::io::Write;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use serde_yaml::Value;
use thiserror::Error;

use crate::cache::{CacheError, CacheStore, FactEnvironment, HostEnvironment, Lookup, DEFAULT_TTL_SECS};

/// Error types for running a command
#[derive(Debug, Error)]
pub enum CliError {
    /// The value given to `put` is not valid YAML
    #[error("Invalid value: {0}")]
    InvalidValue(#[source] serde_yaml::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Writing to stdout failed
    #[error("Cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

/// factcache - cache fact values on disk with a time-to-live
#[derive(Parser, Debug)]
#[command(name = "factcache")]
#[command(about = "Disk-backed YAML cache with TTL expiry for external facts")]
#[command(version)]
pub struct Cli {
    /// External facts directory holding the cache files
    #[arg(long, global = true, env = "FACTCACHE_FACTS_DIR", value_name = "DIR")]
    pub facts_dir: Option<PathBuf>,

    /// Ignore external facts and use /etc/facter/facts.d
    #[arg(long, global = true)]
    pub no_external_facts: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a cached value if it is younger than the TTL
    Get {
        key: String,
        /// Maximum age in seconds; 0 is never fresh
        #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
        ttl: u64,
        /// Read this file instead of <facts dir>/<KEY>.yaml
        #[arg(long, value_name = "PATH")]
        source: Option<PathBuf>,
    },
    /// Store a value, replacing any previous entry
    Put {
        key: String,
        /// Value as YAML, e.g. `10.4`, `[a, b]` or `{os: linux}`
        value: String,
        /// Store VALUE as a plain string instead of parsing it
        #[arg(long)]
        raw: bool,
        /// Write this file instead of <facts dir>/<KEY>.yaml
        #[arg(long, value_name = "PATH")]
        source: Option<PathBuf>,
    },
    /// Print the cache file a key resolves to
    Path {
        key: String,
        #[arg(long, value_name = "PATH")]
        source: Option<PathBuf>,
    },
}

/// Result of a successful command run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A fresh value was printed
    Hit,
    /// No usable value: missing, expired or unreadable
    Absent,
    /// A value was written
    Written,
    /// A path was printed
    Resolved,
}

impl Outcome {
    /// Process exit status for this outcome
    pub fn exit_status(self) -> u8 {
        match self {
            Outcome::Absent => 1,
            Outcome::Hit | Outcome::Written | Outcome::Resolved => 0,
        }
    }
}

impl Cli {
    /// Builds the host environment from the facts directory options
    ///
    /// `--no-external-facts` wins over `--facts-dir`. With neither, the current
    /// user's default facts directory is used.
    pub fn environment(&self) -> HostEnvironment {
        if self.no_external_facts {
            return HostEnvironment::without_external_facts();
        }
        match &self.facts_dir {
            Some(dir) => HostEnvironment::with_dir(dir.clone()),
            None => HostEnvironment::for_current_user(),
        }
    }

    /// Default log filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Parses the `put` value argument
pub fn parse_value_arg(value: &str, raw: bool) -> Result<Value, CliError> {
    if raw {
        return Ok(Value::String(value.to_string()));
    }
    serde_yaml::from_str(value).map_err(CliError::InvalidValue)
}

/// Runs `command` against `store`, printing results to `out`
pub fn execute<E: FactEnvironment>(
    command: &Command,
    store: &CacheStore<E>,
    out: &mut impl Write,
) -> Result<Outcome, CliError> {
    match command {
        Command::Get { key, ttl, source } => match store.get::<Value>(key, *ttl, source.as_deref()) {
            Lookup::Hit(cached) => {
                let yaml = serde_yaml::to_string(&cached.data)
                    .map_err(|e| CliError::Cache(CacheError::Serialize(e)))?;
                out.write_all(yaml.as_bytes())?;
                Ok(Outcome::Hit)
            }
            // A malformed key is a usage error, not a cache miss.
            Lookup::Failed(err @ CacheError::InvalidKey(_)) => Err(err.into()),
            Lookup::Missing | Lookup::Expired { .. } | Lookup::Failed(_) => Ok(Outcome::Absent),
        },
        Command::Put {
            key,
            value,
            raw,
            source,
        } => {
            let value = parse_value_arg(value, *raw)?;
            store.put(key, &value, source.as_deref())?;
            Ok(Outcome::Written)
        }
        Command::Path { key, source } => {
            let path = store.resolve_path(key, source.as_deref())?;
            writeln!(out, "{}", path.display())?;
            Ok(Outcome::Resolved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (CacheStore<HostEnvironment>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::new(HostEnvironment::with_dir(temp_dir.path()));
        (store, temp_dir)
    }

    fn run(args: &[&str], store: &CacheStore<HostEnvironment>) -> (Result<Outcome, CliError>, String) {
        let cli = Cli::parse_from(std::iter::once("factcache").chain(args.iter().copied()));
        let mut out = Vec::new();
        let result = execute(&cli.command, store, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_value_arg_yaml() {
        let value = parse_value_arg("[a, b]", false).unwrap();
        assert_eq!(
            value,
            Value::Sequence(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_parse_value_arg_raw_keeps_string() {
        let value = parse_value_arg("10.4", true).unwrap();
        assert_eq!(value, Value::String("10.4".to_string()));
    }

    #[test]
    fn test_parse_value_arg_invalid() {
        let result = parse_value_arg("key: [unterminated", false);
        assert!(matches!(result, Err(CliError::InvalidValue(_))));
    }

    #[test]
    fn test_cli_get_defaults_ttl() {
        let cli = Cli::parse_from(["factcache", "get", "os_version"]);
        match cli.command {
            Command::Get { key, ttl, source } => {
                assert_eq!(key, "os_version");
                assert_eq!(ttl, 3600);
                assert!(source.is_none());
            }
            other => panic!("expected get, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::parse_from(["factcache", "path", "os", "--facts-dir", "/tmp/facts", "-vv"]);
        assert_eq!(cli.facts_dir, Some(PathBuf::from("/tmp/facts")));
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn test_environment_prefers_no_external_facts() {
        let cli = Cli::parse_from([
            "factcache",
            "--facts-dir",
            "/tmp/facts",
            "--no-external-facts",
            "path",
            "os",
        ]);
        assert!(!cli.environment().supports_external_facts());
    }

    #[test]
    fn test_environment_uses_facts_dir() {
        let cli = Cli::parse_from(["factcache", "--facts-dir", "/tmp/facts", "path", "os"]);
        assert_eq!(cli.environment().default_search_directory(), PathBuf::from("/tmp/facts"));
    }

    #[test]
    fn test_put_then_get_prints_value() {
        let (store, _temp_dir) = create_test_store();

        let (result, _) = run(&["put", "os_version", "--raw", "10.4"], &store);
        assert_eq!(result.unwrap(), Outcome::Written);

        let (result, out) = run(&["get", "os_version"], &store);
        assert_eq!(result.unwrap(), Outcome::Hit);
        assert!(out.contains("10.4"), "unexpected output: {}", out);
    }

    #[test]
    fn test_get_zero_ttl_is_absent() {
        let (store, _temp_dir) = create_test_store();
        run(&["put", "os_version", "10.4"], &store).0.unwrap();

        let (result, out) = run(&["get", "os_version", "--ttl", "0"], &store);

        assert_eq!(result.unwrap(), Outcome::Absent);
        assert!(out.is_empty());
    }

    #[test]
    fn test_get_never_written_is_absent() {
        let (store, _temp_dir) = create_test_store();
        let (result, _) = run(&["get", "never_written"], &store);
        assert_eq!(result.unwrap().exit_status(), 1);
    }

    #[test]
    fn test_get_invalid_key_is_error() {
        let (store, _temp_dir) = create_test_store();
        let (result, _) = run(&["get", "../passwd"], &store);
        assert!(matches!(result, Err(CliError::Cache(CacheError::InvalidKey(_)))));
    }

    #[test]
    fn test_put_into_missing_source_dir_is_error() {
        let (store, temp_dir) = create_test_store();
        let source = temp_dir.path().join("missing").join("facts.yaml");

        let (result, _) = run(
            &["put", "os_version", "10.4", "--source", source.to_str().unwrap()],
            &store,
        );

        assert!(matches!(result, Err(CliError::Cache(CacheError::Io { .. }))));
    }

    #[test]
    fn test_path_prints_resolved_file() {
        let (store, temp_dir) = create_test_store();

        let (result, out) = run(&["path", "os_version"], &store);

        assert_eq!(result.unwrap(), Outcome::Resolved);
        assert_eq!(
            out.trim_end(),
            temp_dir.path().join("os_version.yaml").display().to_string()
        );
    }
}
