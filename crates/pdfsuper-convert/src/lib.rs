//! # pdfsuper-convert
//!
//! Converts PDF documents to Word (`.docx`) or Excel (`.xlsx`) by driving an
//! external converter: a headless office suite, or a Python runtime running
//! a generated helper script.
//!
//! ## Pipeline
//!
//! Each request locates the converter, creates a private workspace, runs the
//! converter into the workspace's empty output directory, identifies the one
//! file it produced, moves that file to the requested destination and
//! removes the workspace. [`ConversionService`] admits one request at a time
//! and publishes the current [`Phase`] on a watch channel.
//!
//! ## Converter discovery
//!
//! The executable is taken from configuration when set, then from the
//! Windows registry (LibreOffice), a list of known installation paths, and
//! finally the system PATH.

pub mod error;
pub mod locator;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod relocator;
pub mod resolver;
pub mod runner;
pub mod scripting;
pub mod service;
pub mod workspace;

pub use error::ConversionError;
pub use locator::ConverterLocator;
pub use metrics::MetricsSnapshot;
pub use models::{ConversionReport, ConversionRequest, ConverterHandle, Phase, TargetFormat};
pub use orchestrator::ConversionOrchestrator;
pub use service::ConversionService;
