//! # pdfsuper-core
//!
//! Core crate for PDF Super Tool. Contains the configuration schemas and
//! the unified error system shared by the conversion, page and CLI crates.
//!
//! This crate has **no** internal dependencies on other PDF Super Tool crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
