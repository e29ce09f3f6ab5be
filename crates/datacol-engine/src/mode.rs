//! Column modes, buffer types and plot designations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a column. Determines the buffer kind and the filters.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnMode {
    #[default]
    Numeric,
    Text,
    DateTime,
    Month,
    Day,
}

impl ColumnMode {
    /// The buffer representation used for this mode.
    pub fn data_type(self) -> DataType {
        match self {
            ColumnMode::Numeric => DataType::Double,
            ColumnMode::Text => DataType::Text,
            ColumnMode::DateTime | ColumnMode::Month | ColumnMode::Day => DataType::DateTime,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnMode::Numeric => "numeric",
            ColumnMode::Text => "text",
            ColumnMode::DateTime => "datetime",
            ColumnMode::Month => "month",
            ColumnMode::Day => "day",
        }
    }
}

impl fmt::Display for ColumnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ColumnMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "numeric" => Ok(ColumnMode::Numeric),
            "text" => Ok(ColumnMode::Text),
            "datetime" => Ok(ColumnMode::DateTime),
            "month" => Ok(ColumnMode::Month),
            "day" => Ok(ColumnMode::Day),
            _ => Err(format!("Unknown column mode: {}", s)),
        }
    }
}

/// Concrete buffer kind behind a column.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum DataType {
    Double,
    Text,
    DateTime,
}

/// Role of a column for downstream plotting.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotDesignation {
    #[default]
    None,
    X,
    Y,
    Z,
    XError,
    YError,
}

impl fmt::Display for PlotDesignation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlotDesignation::None => "none",
            PlotDesignation::X => "X",
            PlotDesignation::Y => "Y",
            PlotDesignation::Z => "Z",
            PlotDesignation::XError => "xErr",
            PlotDesignation::YError => "yErr",
        };
        f.write_str(label)
    }
}
