//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use pdfsuper_core::config::AppConfig;
use pdfsuper_core::AppResult;
use pdfsuper_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Commented default configuration shipped with the binary.
const DEFAULT_CONFIG: &str = include_str!("../../../../config/default.toml");

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration and print a summary
    Validate,
    /// Write the default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        ConfigCommand::Show => output::print_item(config, format),
        ConfigCommand::Validate => {
            // Loading already validated it.
            output::print_success("Configuration is valid");
            output::print_kv("Converter", config.converter.kind.as_str());
            output::print_kv(
                "Executable",
                &config
                    .converter
                    .executable
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(auto-discover)".to_string()),
            );
            output::print_kv(
                "Temp root",
                &config.converter.effective_temp_root().display().to_string(),
            );
            output::print_kv("Timeout (s)", &config.converter.timeout_seconds.to_string());
            output::print_kv("Log level", &config.logging.level);
        }
        ConfigCommand::Generate { output: out_path } => {
            if let Some(parent) = std::path::Path::new(out_path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }

            tokio::fs::write(out_path, DEFAULT_CONFIG)
                .await
                .map_err(|e| AppError::storage(format!("Failed to write config: {e}")))?;

            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }

    Ok(())
}
