//! PDF Super Tool CLI entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use pdfsuper_core::config::AppConfig;
use pdfsuper_core::config::logging::LoggingConfig;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            output::print_error(&format!("Failed to load configuration: {e}"));
            std::process::exit(commands::exit_code(&e));
        }
    };

    init_logging(&config.logging);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting pdfsuper");

    if let Err(e) = cli.execute(config).await {
        output::print_error(&e.to_string());
        std::process::exit(commands::exit_code(&e));
    }
}

/// Initialize tracing. Logs go to stderr; `RUST_LOG` overrides the
/// configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
