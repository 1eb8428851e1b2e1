//! CLI command definitions and dispatch.

pub mod config;
pub mod convert;
pub mod locate;
pub mod pages;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pdfsuper_core::config::AppConfig;
use pdfsuper_core::AppResult;
use pdfsuper_core::error::{AppError, ErrorKind};

use crate::output::OutputFormat;

/// PDF Super Tool: convert PDFs to Word or Excel, split and merge them
#[derive(Debug, Parser)]
#[command(name = "pdfsuper", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file (overlays config/default.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert a PDF to Word or Excel with an external converter
    Convert(convert::ConvertArgs),
    /// Split a PDF into one file per page
    Split(pages::SplitArgs),
    /// Merge PDFs into one document
    Merge(pages::MergeArgs),
    /// Show which converter executable would be used
    Locate(locate::LocateArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        match &self.command {
            Commands::Convert(args) => convert::execute(args, &config, self.format).await,
            Commands::Split(args) => pages::split(args, &config, self.format).await,
            Commands::Merge(args) => pages::merge(args, self.format).await,
            Commands::Locate(args) => locate::execute(args, &config, self.format),
            Commands::Config(args) => config::execute(args, &config, self.format).await,
        }
    }
}

/// Process exit code for a failed command.
pub fn exit_code(err: &AppError) -> i32 {
    match err.kind {
        ErrorKind::Cancelled => 130,
        ErrorKind::Configuration | ErrorKind::Validation => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pdfsuper_convert::TargetFormat;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "pdfsuper",
            "--format",
            "json",
            "convert",
            "my report.pdf",
            "--to",
            "excel",
            "--timeout",
            "30",
        ])
        .expect("parse");

        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.input, PathBuf::from("my report.pdf"));
        assert_eq!(args.to, TargetFormat::Excel);
        assert_eq!(args.timeout, Some(30));
        assert!(args.output.is_none());
    }

    #[test]
    fn test_convert_rejects_unknown_target() {
        let result = Cli::try_parse_from(["pdfsuper", "convert", "a.pdf", "--to", "pptx"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_merge() {
        let cli = Cli::try_parse_from([
            "pdfsuper", "merge", "a.pdf", "b.pdf", "c.pdf", "--output", "all.pdf",
        ])
        .expect("parse");
        let Commands::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.inputs.len(), 3);
        assert_eq!(args.output, PathBuf::from("all.pdf"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&AppError::cancelled("stop")), 130);
        assert_eq!(exit_code(&AppError::validation("bad")), 2);
        assert_eq!(exit_code(&AppError::external_tool("boom")), 1);
    }
}
