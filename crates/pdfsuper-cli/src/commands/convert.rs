//! `convert`: PDF to Word/Excel through the external converter.

use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use pdfsuper_convert::{ConversionRequest, ConversionService, Phase, TargetFormat};
use pdfsuper_core::config::AppConfig;
use pdfsuper_core::config::converter::ConverterKind;
use pdfsuper_core::AppResult;

use crate::output::{self, OutputFormat};

/// Arguments for the convert command
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// PDF document to convert
    pub input: PathBuf,

    /// Target format: word (docx) or excel (xlsx)
    #[arg(short, long)]
    pub to: TargetFormat,

    /// Output path (default: the input path with the target extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Converter backend: office or python
    #[arg(long)]
    pub converter: Option<ConverterKind>,

    /// Converter executable or install directory
    #[arg(long)]
    pub executable: Option<PathBuf>,

    /// Timeout in seconds (0 disables)
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Execute the convert command
pub async fn execute(
    args: &ConvertArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    let mut converter = config.converter.clone();
    if let Some(kind) = args.converter {
        converter.kind = kind;
    }
    if let Some(executable) = &args.executable {
        converter.executable = Some(executable.clone());
    }
    if let Some(timeout) = args.timeout {
        converter.timeout_seconds = timeout;
    }
    converter.validate()?;

    let request = match &args.output {
        Some(destination) => ConversionRequest::new(&args.input, args.to, destination),
        None => ConversionRequest::beside_source(&args.input, args.to),
    };

    let service = ConversionService::new(converter);
    let cancel = CancellationToken::new();

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                output::print_warning("Interrupted, cancelling conversion");
                cancel.cancel();
            }
        })
    };

    let mut status = service.subscribe();
    let target = args.to;
    let printer = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let phase = *status.borrow_and_update();
            output::print_status(&status_line(phase, target));
            if phase.is_terminal() {
                break;
            }
        }
    });

    let result = service.convert_with_report(request, cancel).await;
    interrupt.abort();
    drop(service);
    let _ = printer.await;

    let report = result?;
    match format {
        OutputFormat::Table => {
            output::print_success(&format!(
                "Converted to {}",
                report.destination.display()
            ));
            output::print_kv("Converter", &report.converter.executable.display().to_string());
            output::print_kv("Found via", report.converter.discovery_method.label());
            output::print_kv("Size (bytes)", &report.size.to_string());
            output::print_kv("Elapsed (ms)", &report.elapsed_ms.to_string());
        }
        OutputFormat::Json => output::print_json(&report),
    }
    Ok(())
}

/// One-line description of a phase.
fn status_line(phase: Phase, target: TargetFormat) -> String {
    match phase {
        Phase::Idle => "Idle".to_string(),
        Phase::LocatingConverter => "Locating converter...".to_string(),
        Phase::PreparingWorkspace => "Preparing workspace...".to_string(),
        Phase::Converting => format!("Converting to {target}..."),
        Phase::ResolvingOutput => "Checking converter output...".to_string(),
        Phase::Relocating => "Saving result...".to_string(),
        Phase::Done => "Done".to_string(),
        Phase::Failed => "Failed".to_string(),
    }
}
