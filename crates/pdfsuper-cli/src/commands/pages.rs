//! `split` and `merge`: in-process page operations.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use pdfsuper_core::config::AppConfig;
use pdfsuper_core::AppResult;
use pdfsuper_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for the split command
#[derive(Debug, Args)]
pub struct SplitArgs {
    /// PDF document to split
    pub input: PathBuf,

    /// Directory for the page files (default: the input's directory)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Text between the file stem and the page number
    #[arg(long)]
    pub infix: Option<String>,
}

/// Arguments for the merge command
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Documents to merge, in order (at least two)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Merged output file
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Split output row
#[derive(Debug, Serialize, Tabled)]
struct PageRow {
    /// Page number
    page: usize,
    /// Written file
    path: String,
}

/// Execute the split command
pub async fn split(
    args: &SplitArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    if !args.input.is_file() {
        return Err(AppError::validation(format!(
            "Input PDF not found: {}",
            args.input.display()
        )));
    }

    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| default_out_dir(&args.input));
    let infix = args
        .infix
        .clone()
        .unwrap_or_else(|| config.pages.split_infix.clone());

    let written = pdfsuper_pages::split_file(args.input.clone(), out_dir.clone(), infix).await?;

    let rows: Vec<PageRow> = written
        .iter()
        .enumerate()
        .map(|(i, path)| PageRow {
            page: i + 1,
            path: path.display().to_string(),
        })
        .collect();

    if format == OutputFormat::Table {
        output::print_success(&format!(
            "Split into {} pages in {}",
            rows.len(),
            out_dir.display()
        ));
    }
    output::print_list(&rows, format);
    Ok(())
}

/// Execute the merge command
pub async fn merge(args: &MergeArgs, format: OutputFormat) -> AppResult<()> {
    let pages = pdfsuper_pages::merge_files(args.inputs.clone(), args.output.clone()).await?;

    match format {
        OutputFormat::Table => {
            output::print_success(&format!("Merged into {}", args.output.display()));
            output::print_kv("Documents", &args.inputs.len().to_string());
            output::print_kv("Pages", &pages.to_string());
        }
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "output": args.output,
            "documents": args.inputs.len(),
            "pages": pages,
        })),
    }
    Ok(())
}

fn default_out_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
