//! Split/merge configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Settings for the in-process page operations.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct PagesConfig {
    /// Infix placed between the source stem and the page number when
    /// splitting, e.g. `report_pag_3.pdf`.
    #[serde(default = "default_split_infix")]
    #[validate(length(min = 1, max = 32))]
    pub split_infix: String,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            split_infix: default_split_infix(),
        }
    }
}

fn default_split_infix() -> String {
    "_pag_".to_string()
}
