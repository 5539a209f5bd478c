//! factcache - cache fact values on disk with a time-to-live
//!
//! Lets external fact scripts skip recomputing expensive values: `get` prints a
//! cached value and exits 0 while it is fresh, exits 1 otherwise.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use factcache::cli::{execute, Cli};
use factcache::CacheStore;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let store = CacheStore::new(cli.environment());
    let mut stdout = io::stdout().lock();

    match execute(&cli.command, &store, &mut stdout) {
        Ok(outcome) => ExitCode::from(outcome.exit_status()),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(2)
        }
    }
}
