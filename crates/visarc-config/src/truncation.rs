//! Precision policy for the truncation stage.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Precision controls for the lossy truncation stage.
///
/// The truncation stage quantizes visibility data and weights independently,
/// each against its own error budget. These three parameters are the only
/// knobs it exposes; the defaults are the operationally proven values for
/// archive conversion.
///
/// # TOML profile format
///
/// ```toml
/// err_sq_lim = 3e-3
/// data_fixed_precision = 1e-4
/// weight_fixed_precision = 1e-3
/// ```
///
/// Omitted keys fall back to the defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TruncationConfig {
    /// Maximum tolerated squared relative error.
    #[serde(default = "default_err_sq_lim")]
    pub err_sq_lim: f64,

    /// Fixed precision applied to visibility data.
    #[serde(default = "default_data_fixed_precision")]
    pub data_fixed_precision: f64,

    /// Fixed precision applied to weights.
    #[serde(default = "default_weight_fixed_precision")]
    pub weight_fixed_precision: f64,
}

fn default_err_sq_lim() -> f64 {
    3e-3
}

fn default_data_fixed_precision() -> f64 {
    1e-4
}

fn default_weight_fixed_precision() -> f64 {
    1e-3
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            err_sq_lim: default_err_sq_lim(),
            data_fixed_precision: default_data_fixed_precision(),
            weight_fixed_precision: default_weight_fixed_precision(),
        }
    }
}

impl TruncationConfig {
    /// Set the squared relative error limit.
    pub fn with_err_sq_lim(mut self, err_sq_lim: f64) -> Self {
        self.err_sq_lim = err_sq_lim;
        self
    }

    /// Set the fixed precision for visibility data.
    pub fn with_data_fixed_precision(mut self, precision: f64) -> Self {
        self.data_fixed_precision = precision;
        self
    }

    /// Set the fixed precision for weights.
    pub fn with_weight_fixed_precision(mut self, precision: f64) -> Self {
        self.weight_fixed_precision = precision;
        self
    }

    /// Check that every parameter is strictly positive and finite.
    ///
    /// A zero or negative error budget has no meaning to the quantizer, so
    /// it is rejected before the configuration ever reaches the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (param, value) in [
            ("err_sq_lim", self.err_sq_lim),
            ("data_fixed_precision", self.data_fixed_precision),
            ("weight_fixed_precision", self.weight_fixed_precision),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidPrecision { param, value });
            }
        }
        Ok(())
    }

    /// Load a precision profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse a precision profile from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: TruncationConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
