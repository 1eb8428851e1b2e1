//! `locate`: report which converter executable discovery finds.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use pdfsuper_convert::{ConversionError, ConverterLocator};
use pdfsuper_convert::locator::LocateError;
use pdfsuper_core::config::AppConfig;
use pdfsuper_core::config::converter::ConverterKind;
use pdfsuper_core::AppResult;

use crate::output::{self, OutputFormat};

/// Arguments for the locate command
#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Converter backend: office or python
    #[arg(long)]
    pub converter: Option<ConverterKind>,

    /// Converter executable or install directory to check first
    #[arg(long)]
    pub executable: Option<PathBuf>,
}

/// Probed location row
#[derive(Debug, Serialize, Tabled)]
struct SearchedRow {
    /// Probe order
    order: usize,
    /// Probed path
    path: String,
}

/// Execute the locate command
pub fn execute(args: &LocateArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let mut converter = config.converter.clone();
    if let Some(kind) = args.converter {
        converter.kind = kind;
    }
    if let Some(executable) = &args.executable {
        converter.executable = Some(executable.clone());
    }

    match ConverterLocator::from_config(&converter).locate() {
        Ok(handle) => {
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Found {} converter", handle.kind));
                    output::print_kv("Executable", &handle.executable.display().to_string());
                    output::print_kv("Found via", handle.discovery_method.label());
                }
                OutputFormat::Json => output::print_json(&handle),
            }
            Ok(())
        }
        Err(LocateError::NotFound { kind, searched }) => {
            let rows: Vec<SearchedRow> = searched
                .iter()
                .enumerate()
                .map(|(i, path)| SearchedRow {
                    order: i + 1,
                    path: path.display().to_string(),
                })
                .collect();
            if format == OutputFormat::Table {
                output::print_warning(&format!("No {kind} converter found. Searched:"));
            }
            output::print_list(&rows, format);
            Err(ConversionError::from(LocateError::NotFound { kind, searched }).into())
        }
    }
}
