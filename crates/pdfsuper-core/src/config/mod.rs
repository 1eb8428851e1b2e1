//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod converter;
pub mod logging;
pub mod pages;

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::converter::ConverterConfig;
use self::logging::LoggingConfig;
use self::pages::PagesConfig;

use crate::error::AppError;

/// Default configuration file, loaded when present.
const DEFAULT_CONFIG_FILE: &str = "config/default";

/// Prefix of environment variable overrides (`PDFSUPER__CONVERTER__KIND`).
const ENV_PREFIX: &str = "PDFSUPER";

/// Root application configuration.
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// External converter settings.
    #[serde(default)]
    #[validate(nested)]
    pub converter: ConverterConfig,
    /// Split/merge settings.
    #[serde(default)]
    #[validate(nested)]
    pub pages: PagesConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `config/default.toml` (if present), the explicit file (which
    /// must exist when given) and environment variables prefixed with
    /// `PDFSUPER__`, then validates the result.
    pub fn load(explicit: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.validate()?;
        Ok(app)
    }
}
