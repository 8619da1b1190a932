//! # Configuration
//!
//! margin configuration is managed by [`clapfig`], which handles layered
//! loading from TOML files, environment variables, and programmatic overrides.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `MARGIN__HIGHLIGHT_CLASS`, etc.
//! 2. **Data-dir Config**: `margin.toml` in the directory given by `--data`.
//! 3. **Global Config**: `margin.toml` in the global data directory.
//! 4. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `highlight_selectors` | `["span.suggestion-highlight", "mark"]` | CSS selectors of highlight markers |
//! | `highlight_class` | `suggestion-highlight` | Class given to markers this tool creates |
//! | `reenhance_interval_ms` | `1500` | Minimum time between mutation-triggered re-enhancements |

use crate::error::Result;
use crate::markup::{default_highlight_selectors, HighlightMarkers, DEFAULT_HIGHLIGHT_CLASS};
use confique::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_REENHANCE_INTERVAL_MS: u64 = 1500;

/// Configuration for margin, stored in `margin.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MarginConfig {
    /// CSS selectors identifying highlight markers in region markup.
    /// When absent, defaults to ["span.suggestion-highlight", "mark"].
    pub highlight_selectors: Option<Vec<String>>,

    /// Class name put on highlight markers created by margin.
    #[config(default = "suggestion-highlight")]
    pub highlight_class: String,

    /// Minimum interval between two re-enhancements triggered by page mutations.
    #[config(default = 1500)]
    pub reenhance_interval_ms: u64,
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            highlight_selectors: None,
            highlight_class: DEFAULT_HIGHLIGHT_CLASS.to_string(),
            reenhance_interval_ms: DEFAULT_REENHANCE_INTERVAL_MS,
        }
    }
}

impl MarginConfig {
    /// Highlight selectors, using defaults if not configured.
    pub fn highlight_selectors(&self) -> Vec<String> {
        self.highlight_selectors
            .clone()
            .unwrap_or_else(default_highlight_selectors)
    }

    pub fn reenhance_interval(&self) -> Duration {
        Duration::from_millis(self.reenhance_interval_ms)
    }

    /// Validated marker matcher for this configuration.
    pub fn markers(&self) -> Result<HighlightMarkers> {
        HighlightMarkers::new(self.highlight_selectors(), self.highlight_class.as_str())
    }
}
