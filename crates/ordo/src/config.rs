#![forbid(unsafe_code)]

//! Reorder-surface configuration as data.
//!
//! Every tunable lives in [`OrdoConfig`] and can be loaded from TOML or JSON.
//! Missing sections and fields fall back to defaults, so an empty file is a
//! valid configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [drag]
//! threshold = 4.0
//! keyboard = true
//!
//! [collision]
//! strategy = "axis_constrained"
//! axis = "horizontal"
//!
//! [sync]
//! skip_noop_writes = true
//! adopt_server_order = false
//! max_pending = 32
//! ```

use std::fmt;
use std::path::Path;

use ordo_drag::{CollisionStrategy, DragConfig};
use ordo_sync::SyncConfig;
use serde::{Deserialize, Serialize};

/// Complete configuration for one reorder surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdoConfig {
    /// Drag session tuning.
    pub drag: DragConfig,
    /// How the container under the pointer is chosen.
    pub collision: CollisionStrategy,
    /// Optimistic sync policy.
    pub sync: SyncConfig,
}

impl OrdoConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Load by extension: `.json` as JSON, anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Validate all parameters.
    ///
    /// Returns a list of problems. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Err(error) = self.drag.validate() {
            errors.push(format!("drag: {error}"));
        }
        if let Err(error) = self.sync.validate() {
            errors.push(format!("sync: {error}"));
        }

        errors
    }

    /// Validate and wrap problems in [`ConfigError::Validation`].
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    Toml(toml::de::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
