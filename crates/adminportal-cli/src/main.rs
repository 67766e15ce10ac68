//! Admin portal CLI - an interactive shell for signing in, registering,
//! recovering a password and contacting support.

mod commands;
mod prompt;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adminportal_core::{ApiClient, AuthStorage, Config, SessionStore};

use commands::Shell;

const LOG_FILE: &str = "adminportal.log";

/// Initialize the tracing subscriber.
///
/// Logs go to a file in the cache directory so they do not interleave with
/// prompts; `--verbose` sends them to stderr instead. The returned guard
/// flushes the file writer on drop.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = if verbose {
        None
    } else {
        Config::log_dir()
            .ok()
            .filter(|dir| std::fs::create_dir_all(dir).is_ok())
    };

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

fn print_usage() {
    println!("Usage: adminportal [--verbose]");
    println!();
    println!("  -v, --verbose   Log to stderr instead of the log file");
    println!("  -h, --help      Show this help");
    println!();
    println!("Environment:");
    println!("  {}   Auth API base URL", adminportal_core::config::ENV_API_BASE_URL);
    println!("  {}   Request timeout in seconds", adminportal_core::config::ENV_TIMEOUT_SECS);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    if let Some(unknown) = args.iter().find(|a| !matches!(a.as_str(), "-v" | "--verbose")) {
        eprintln!("Unknown argument: {}", unknown);
        print_usage();
        return Ok(());
    }

    let _guard = init_tracing(verbose);
    info!("Admin portal CLI starting");

    let config = Config::load();
    let storage_dir = Config::storage_dir()?;
    let storage = AuthStorage::open(&storage_dir)
        .with_context(|| format!("Failed to open storage in {}", storage_dir.display()))?;
    let client = Arc::new(ApiClient::new(&config, storage.clone())?);

    let mut store = SessionStore::new(client.clone(), storage);
    store.initialize().await;
    if let Some(user) = store.user() {
        println!("Signed in as {} <{}>", user.display_name, user.email);
    }

    let mut shell = Shell::new(client, store, config);
    let result = shell.run().await;
    if let Err(e) = &result {
        warn!(error = %e, "Shell exited with an error");
    }

    info!("Admin portal CLI shutting down");
    result
}
