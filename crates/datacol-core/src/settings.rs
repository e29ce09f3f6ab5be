//! User settings, read from TOML.
//!
//! ```toml
//! [history]
//! max_depth = 100
//!
//! [display]
//! numeric_format = "automatic"
//! digits = 6
//! datetime_format = "%Y-%m-%d %H:%M:%S"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use datacol_engine::filter::{DEFAULT_DATETIME_FORMAT, DEFAULT_DIGITS};
use datacol_engine::{ColumnMode, NumericFormat, OutputFilter};

use crate::error::Result;
use crate::history::DEFAULT_MAX_DEPTH;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub history: HistorySettings,
    pub display: DisplaySettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum undo entries kept; 0 keeps everything.
    pub max_depth: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        HistorySettings {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub numeric_format: NumericFormat,
    pub digits: usize,
    pub datetime_format: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            numeric_format: NumericFormat::default(),
            digits: DEFAULT_DIGITS,
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Output filter for `mode` using the display settings. Month and day
    /// columns always show names.
    pub fn output_filter(&self, mode: ColumnMode) -> OutputFilter {
        match mode {
            ColumnMode::Numeric => OutputFilter::Numeric {
                format: self.display.numeric_format,
                digits: self.display.digits,
            },
            ColumnMode::DateTime => OutputFilter::DateTime {
                format: self.display.datetime_format.clone(),
            },
            ColumnMode::Text | ColumnMode::Month | ColumnMode::Day => OutputFilter::for_mode(mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str("[display]\ndigits = 3\n").unwrap();
        assert_eq!(settings.display.digits, 3);
        assert_eq!(settings.display.numeric_format, NumericFormat::Automatic);
        assert_eq!(settings.history.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_output_filter_from_display_settings() {
        let settings = Settings::from_toml_str(
            "[display]\nnumeric_format = \"scientific\"\ndatetime_format = \"%d.%m.%Y\"\n",
        )
        .unwrap();
        assert_eq!(
            settings.output_filter(ColumnMode::Numeric),
            OutputFilter::Numeric {
                format: NumericFormat::Scientific,
                digits: DEFAULT_DIGITS
            }
        );
        assert_eq!(
            settings.output_filter(ColumnMode::DateTime),
            OutputFilter::DateTime {
                format: "%d.%m.%Y".to_string()
            }
        );
        assert_eq!(settings.output_filter(ColumnMode::Month), OutputFilter::for_mode(ColumnMode::Month));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(Settings::from_toml_str("[history]\nmax_depth = \"lots\"\n").is_err());
    }
}
