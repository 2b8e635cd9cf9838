//! Number formatting and rounding.
//!
//! Pure functions of the precision settings; every tree label and every
//! value view goes through `format_number`.

use serde::{Deserialize, Serialize};

/// Which precision configuration applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrecisionFormat {
    /// Labels inside the trees
    Trees,
    /// Everything else (tooltips, statistics, dialogs)
    Default,
}

/// Precision of one format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormatPrecision {
    /// Digits after the decimal point
    pub precision: usize,
    /// Values with an absolute value below `10^-round_exponent` are shown as zero
    pub round_exponent: i32,
    /// Values with an absolute value of at least `10^exponent_threshold` use scientific notation
    pub exponent_threshold: i32,
}

/// Precision configuration for all formats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionSettings {
    pub trees: FormatPrecision,
    pub default: FormatPrecision,
}

impl Default for PrecisionSettings {
    fn default() -> Self {
        PrecisionSettings {
            trees: FormatPrecision {
                precision: 2,
                round_exponent: 7,
                exponent_threshold: 5,
            },
            default: FormatPrecision {
                precision: 6,
                round_exponent: 12,
                exponent_threshold: 7,
            },
        }
    }
}

impl PrecisionSettings {
    pub fn get(&self, format: PrecisionFormat) -> &FormatPrecision {
        match format {
            PrecisionFormat::Trees => &self.trees,
            PrecisionFormat::Default => &self.default,
        }
    }

    /// Smallest absolute value that is not displayed as zero.
    pub fn round_threshold(&self, format: PrecisionFormat) -> f64 {
        10f64.powi(-self.get(format).round_exponent)
    }

    /// Snaps values below the round threshold to zero.
    pub fn round_number(&self, value: f64, format: PrecisionFormat) -> f64 {
        if value.abs() < self.round_threshold(format) {
            0.0
        } else {
            value
        }
    }

    /// Formats a value for display. NaN (no value) renders as "-".
    pub fn format_number(&self, value: f64, format: PrecisionFormat, integer: bool) -> String {
        if value.is_nan() {
            return "-".to_string();
        }
        let fp = self.get(format);
        let value = self.round_number(value, format);
        if integer {
            return format!("{}", value.round() as i64);
        }
        if value != 0.0 && value.abs() >= 10f64.powi(fp.exponent_threshold) {
            format!("{:.*e}", fp.precision, value)
        } else {
            format!("{:.*}", fp.precision, value)
        }
    }
}
