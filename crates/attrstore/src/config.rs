//! # Configuration
//!
//! Settings are loaded with [`confique`] from, in priority order:
//! 1. **Environment variables**: `ATTRSTORE_UNKNOWN_KEYS`, `ATTRSTORE_NULL_PLACEHOLDER`, ...
//! 2. **Config file**: an `attrstore.toml` passed explicitly.
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `unknown_keys` | `drop` | Blob keys no attribute claims: `drop`, `preserve` or `reject` |
//! | `null_placeholder` | `(null)` | How a null enum option is rendered in messages |
//! | `options_separator` | `", "` | Separator between enum options in messages |

use std::path::Path;

use confique::Config;
use serde::{Deserialize, Serialize};

use crate::error::{AttrError, Result};

/// What the column adapter does with blob keys that no attribute claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeys {
    /// Leave them out of the attribute set; they vanish on the next save.
    #[default]
    Drop,
    /// Keep them verbatim and write them back on save.
    Preserve,
    /// Fail the load.
    Reject,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AttrstoreConfig {
    #[config(env = "ATTRSTORE_UNKNOWN_KEYS", default = "drop")]
    pub unknown_keys: UnknownKeys,

    #[config(env = "ATTRSTORE_NULL_PLACEHOLDER", default = "(null)")]
    pub null_placeholder: String,

    #[config(env = "ATTRSTORE_OPTIONS_SEPARATOR", default = ", ")]
    pub options_separator: String,
}

impl Default for AttrstoreConfig {
    fn default() -> Self {
        Self {
            unknown_keys: UnknownKeys::Drop,
            null_placeholder: "(null)".to_string(),
            options_separator: ", ".to_string(),
        }
    }
}

impl AttrstoreConfig {
    /// Load from the environment and, when given, a TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        builder.load().map_err(|e| AttrError::Config(e.to_string()))
    }
}
