//! Complete, order-preserving snapshots of columns and tables.
//!
//! The JSON layout is what the `datacol` binary reads and writes; other
//! serializers can map to it from the same structs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use datacol_engine::{
    ColumnData, ColumnMode, ColumnStorage, Interval, IntervalAttribute, OutputFilter,
    PlotDesignation,
};

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub plot_designation: PlotDesignation,
    pub mode: ColumnMode,
    /// Display format; the mode's default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_filter: Option<OutputFilter>,
    pub data: ColumnData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid: Vec<Interval>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub masked: Vec<Interval>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formulas: Vec<(Interval, String)>,
}

impl ColumnSnapshot {
    pub fn capture(storage: &ColumnStorage) -> Self {
        let default_filter = OutputFilter::for_mode(storage.mode());
        ColumnSnapshot {
            name: storage.name().to_string(),
            comment: storage.comment().to_string(),
            plot_designation: storage.plot_designation(),
            mode: storage.mode(),
            output_filter: (*storage.output_filter() != default_filter)
                .then(|| storage.output_filter().clone()),
            data: storage.data().clone(),
            invalid: storage.validity().flagged(),
            masked: storage.masking().flagged(),
            formulas: storage.formulas().entries().to_vec(),
        }
    }

    pub fn into_storage(self) -> ColumnStorage {
        let flags = |intervals: Vec<Interval>| {
            IntervalAttribute::from_entries(intervals.into_iter().map(|iv| (iv, true)))
        };
        let output_filter = self
            .output_filter
            .unwrap_or_else(|| OutputFilter::for_mode(self.mode));
        ColumnStorage::from_parts(
            self.name,
            self.comment,
            self.plot_designation,
            self.mode,
            self.data,
            output_filter,
            flags(self.invalid),
            flags(self.masked),
            IntervalAttribute::from_entries(self.formulas),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    #[serde(default)]
    pub name: String,
    pub columns: Vec<ColumnSnapshot>,
}

impl TableSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
