//! Typed column storage.
//!
//! [`ColumnStorage`] owns one column's buffer together with its validity,
//! masking and formula attributes, its filters, and its descriptive fields.
//! It performs mutations directly and never records history; the undo layer
//! in `datacol-core` sits on top of it.
//!
//! Operations that swap whole pieces of state (`replace_data`,
//! `replace_mode_data`, `replace_masking`, ...) hand the displaced state back
//! to the caller, so a backup can be toggled in and out without copying.

use chrono::NaiveDateTime;

use crate::attribute::IntervalAttribute;
use crate::data::{CellValue, ColumnData};
use crate::filter::{
    InputFilter, OutputFilter, date_time_to_julian_day, julian_day_to_date_time,
    month_number, month_to_date_time, weekday_number, weekday_to_date_time,
};
use crate::interval::Interval;
use crate::mode::{ColumnMode, DataType, PlotDesignation};

/// Everything that changes together when a column switches mode.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeData {
    pub mode: ColumnMode,
    pub data: ColumnData,
    pub input_filter: InputFilter,
    pub output_filter: OutputFilter,
    pub validity: IntervalAttribute<bool>,
}

/// Buffer plus validity, the unit swapped by copy and clear.
pub type DataAndValidity = (ColumnData, IntervalAttribute<bool>);

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnStorage {
    name: String,
    comment: String,
    plot_designation: PlotDesignation,
    mode: ColumnMode,
    data: ColumnData,
    input_filter: InputFilter,
    output_filter: OutputFilter,
    validity: IntervalAttribute<bool>,
    masking: IntervalAttribute<bool>,
    formulas: IntervalAttribute<String>,
}

impl ColumnStorage {
    /// An empty column of the given mode with default filters.
    pub fn new(name: impl Into<String>, mode: ColumnMode) -> Self {
        ColumnStorage {
            name: name.into(),
            comment: String::new(),
            plot_designation: PlotDesignation::None,
            mode,
            data: ColumnData::empty(mode.data_type()),
            input_filter: InputFilter::for_mode(mode),
            output_filter: OutputFilter::for_mode(mode),
            validity: IntervalAttribute::new(),
            masking: IntervalAttribute::new(),
            formulas: IntervalAttribute::new(),
        }
    }

    /// An unnamed column used to hold backup rows.
    pub fn detached(mode: ColumnMode) -> Self {
        Self::new(String::new(), mode)
    }

    /// Rebuild a storage from persisted parts. The buffer type wins over
    /// `mode` if the two disagree.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        name: String,
        comment: String,
        plot_designation: PlotDesignation,
        mode: ColumnMode,
        data: ColumnData,
        output_filter: OutputFilter,
        validity: IntervalAttribute<bool>,
        masking: IntervalAttribute<bool>,
        formulas: IntervalAttribute<String>,
    ) -> Self {
        let mode = if mode.data_type() == data.data_type() {
            mode
        } else {
            tracing::warn!(%mode, "buffer type does not match column mode; using buffer type");
            match data.data_type() {
                DataType::Double => ColumnMode::Numeric,
                DataType::Text => ColumnMode::Text,
                DataType::DateTime => ColumnMode::DateTime,
            }
        };
        ColumnStorage {
            name,
            comment,
            plot_designation,
            mode,
            data,
            input_filter: InputFilter::for_mode(mode),
            output_filter,
            validity,
            masking,
            formulas,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn plot_designation(&self) -> PlotDesignation {
        self.plot_designation
    }

    pub fn set_plot_designation(&mut self, pd: PlotDesignation) {
        self.plot_designation = pd;
    }

    pub fn mode(&self) -> ColumnMode {
        self.mode
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn input_filter(&self) -> InputFilter {
        self.input_filter
    }

    pub fn output_filter(&self) -> &OutputFilter {
        &self.output_filter
    }

    /// Install a different output filter (display format) for the current mode.
    pub fn set_output_filter(&mut self, filter: OutputFilter) {
        self.output_filter = filter;
    }

    pub fn validity(&self) -> &IntervalAttribute<bool> {
        &self.validity
    }

    pub fn masking(&self) -> &IntervalAttribute<bool> {
        &self.masking
    }

    pub fn formulas(&self) -> &IntervalAttribute<String> {
        &self.formulas
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    // ---------------------------------------------------------------------
    // Mode conversion
    // ---------------------------------------------------------------------

    /// Convert the buffer to `mode`, row by row, and install `output_filter`.
    /// Cells that fail to convert become invalid. Returns the previous mode
    /// state so it can be restored verbatim.
    pub fn set_mode(&mut self, mode: ColumnMode, output_filter: OutputFilter) -> ModeData {
        let mut validity = self.validity.clone();
        let data = self.convert_data(mode, &mut validity);
        self.replace_mode_data(ModeData {
            mode,
            data,
            input_filter: InputFilter::for_mode(mode),
            output_filter,
            validity,
        })
    }

    /// Swap in a complete mode state; returns the displaced one.
    pub fn replace_mode_data(&mut self, next: ModeData) -> ModeData {
        ModeData {
            mode: std::mem::replace(&mut self.mode, next.mode),
            data: std::mem::replace(&mut self.data, next.data),
            input_filter: std::mem::replace(&mut self.input_filter, next.input_filter),
            output_filter: std::mem::replace(&mut self.output_filter, next.output_filter),
            validity: std::mem::replace(&mut self.validity, next.validity),
        }
    }

    fn convert_data(&self, target: ColumnMode, validity: &mut IntervalAttribute<bool>) -> ColumnData {
        let mut failed: Vec<usize> = Vec::new();
        let converted = match (&self.data, target.data_type()) {
            (ColumnData::Numeric(values), DataType::Text) => ColumnData::Text(
                values
                    .iter()
                    .map(|v| self.output_filter.format_number(*v))
                    .collect(),
            ),
            (ColumnData::Numeric(values), DataType::DateTime) => ColumnData::DateTime(
                values
                    .iter()
                    .enumerate()
                    .map(|(row, v)| {
                        let converted = match target {
                            ColumnMode::Month => month_to_date_time(*v),
                            ColumnMode::Day => weekday_to_date_time(*v),
                            _ => julian_day_to_date_time(*v),
                        };
                        if converted.is_none() {
                            failed.push(row);
                        }
                        converted
                    })
                    .collect(),
            ),
            (ColumnData::Text(values), DataType::Double) => ColumnData::Numeric(
                values
                    .iter()
                    .enumerate()
                    .map(|(row, text)| match InputFilter::Numeric.parse(text) {
                        Some(CellValue::Number(v)) => v,
                        _ => {
                            failed.push(row);
                            0.0
                        }
                    })
                    .collect(),
            ),
            (ColumnData::Text(values), DataType::DateTime) => {
                let filter = InputFilter::for_mode(target);
                ColumnData::DateTime(
                    values
                        .iter()
                        .enumerate()
                        .map(|(row, text)| match filter.parse(text) {
                            Some(CellValue::DateTime(dt)) => dt,
                            _ => {
                                failed.push(row);
                                None
                            }
                        })
                        .collect(),
                )
            }
            (ColumnData::DateTime(values), DataType::Double) => ColumnData::Numeric(
                values
                    .iter()
                    .enumerate()
                    .map(|(row, dt)| match dt {
                        Some(dt) => match self.mode {
                            ColumnMode::Month => month_number(*dt),
                            ColumnMode::Day => weekday_number(*dt),
                            _ => date_time_to_julian_day(*dt),
                        },
                        None => {
                            failed.push(row);
                            0.0
                        }
                    })
                    .collect(),
            ),
            (ColumnData::DateTime(values), DataType::Text) => ColumnData::Text(
                values
                    .iter()
                    .map(|dt| self.output_filter.format_date_time(*dt))
                    .collect(),
            ),
            // Same buffer type: DateTime/Month/Day differ only in filters.
            (data, _) => data.clone(),
        };
        for row in failed {
            tracing::trace!(row, from = %self.mode, to = %target, "cell conversion failed");
            validity.set_value(Interval::single(row), true);
        }
        converted
    }

    // ---------------------------------------------------------------------
    // Bulk data operations
    // ---------------------------------------------------------------------

    /// Swap buffer and validity; returns the displaced pair.
    pub fn replace_data(&mut self, data: ColumnData, validity: IntervalAttribute<bool>) -> DataAndValidity {
        debug_assert_eq!(self.data.data_type(), data.data_type(), "buffer type mismatch");
        (
            std::mem::replace(&mut self.data, data),
            std::mem::replace(&mut self.validity, validity),
        )
    }

    /// Deep copy of buffer and validity.
    pub fn clone_data(&self) -> DataAndValidity {
        (self.data.clone(), self.validity.clone())
    }

    /// Copy `count` rows (data and validity) from `source` starting at
    /// `src_start` into this column at `dest_start`, growing as needed.
    /// `count` is clamped to the rows `source` actually has. Returns the
    /// number of rows copied. Both columns must share a buffer type.
    pub fn copy_from(&mut self, source: &ColumnStorage, src_start: usize, dest_start: usize, count: usize) -> usize {
        debug_assert_eq!(
            self.data_type(),
            source.data_type(),
            "copy between different column types"
        );
        let rows = count.min(source.row_count().saturating_sub(src_start));
        if rows == 0 {
            return 0;
        }
        let chunk = source.data.slice(src_start, rows);
        if !self.data.overwrite(dest_start, &chunk) {
            tracing::warn!(column = %self.name, "copy between different column types ignored");
            return 0;
        }
        let flags = source.validity.slice(src_start, rows);
        self.validity.overwrite(&flags, dest_start, rows);
        rows
    }

    /// A detached column holding rows `first..first+count` (data and validity).
    pub fn slice(&self, first: usize, count: usize) -> ColumnStorage {
        let mut out = ColumnStorage::detached(self.mode);
        out.output_filter = self.output_filter.clone();
        out.data = self.data.slice(first, count);
        out.validity = self.validity.slice(first, out.data.len());
        out
    }

    /// Insert `count` empty rows before `before` (clamped to the row count).
    /// Returns the row at which the rows were actually inserted.
    pub fn insert_empty_rows(&mut self, before: usize, count: usize) -> usize {
        let at = before.min(self.row_count());
        if count == 0 {
            return at;
        }
        self.data.insert_defaults(at, count);
        self.validity.insert_rows(at, count);
        self.masking.insert_rows(at, count);
        self.formulas.insert_rows(at, count);
        at
    }

    /// Remove up to `count` rows starting at `first`. Returns the number of
    /// rows actually removed.
    pub fn remove_rows(&mut self, first: usize, count: usize) -> usize {
        let removed = self.data.remove(first, count);
        if removed > 0 {
            self.validity.remove_rows(first, removed);
            self.masking.remove_rows(first, removed);
            self.formulas.remove_rows(first, removed);
        }
        removed
    }

    /// Number of rows `remove_rows(first, count)` would remove.
    pub fn removable_rows(&self, first: usize, count: usize) -> usize {
        count.min(self.row_count().saturating_sub(first))
    }

    /// Truncate or pad with default cells to exactly `n` rows.
    /// Attribute stores are left alone.
    pub fn resize_to(&mut self, n: usize) {
        self.data.resize(n);
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    pub fn is_invalid(&self, row: usize) -> bool {
        self.validity.value_at(row)
    }

    pub fn is_masked(&self, row: usize) -> bool {
        self.masking.value_at(row)
    }

    /// Formula for `row`; empty when none is set.
    pub fn formula(&self, row: usize) -> &str {
        self.formulas.get(row).map(String::as_str).unwrap_or("")
    }

    pub fn set_invalid(&mut self, interval: Interval, invalid: bool) {
        self.validity.set_value(interval, invalid);
    }

    pub fn set_masked(&mut self, interval: Interval, masked: bool) {
        self.masking.set_value(interval, masked);
    }

    pub fn set_formula(&mut self, interval: Interval, formula: impl Into<String>) {
        self.formulas.set_value(interval, formula.into());
    }

    pub fn clear_validity(&mut self) {
        self.validity.clear();
    }

    pub fn clear_masks(&mut self) {
        self.masking.clear();
    }

    pub fn clear_formulas(&mut self) {
        self.formulas.clear();
    }

    pub fn replace_validity(&mut self, validity: IntervalAttribute<bool>) -> IntervalAttribute<bool> {
        std::mem::replace(&mut self.validity, validity)
    }

    pub fn replace_masking(&mut self, masking: IntervalAttribute<bool>) -> IntervalAttribute<bool> {
        std::mem::replace(&mut self.masking, masking)
    }

    pub fn replace_formulas(&mut self, formulas: IntervalAttribute<String>) -> IntervalAttribute<String> {
        std::mem::replace(&mut self.formulas, formulas)
    }

    // ---------------------------------------------------------------------
    // Cells
    // ---------------------------------------------------------------------

    /// Text of a Text column; empty for other types or past the end.
    pub fn text_at(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Text(v) => v.get(row).cloned().unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Value of a Numeric column; NaN for other types or past the end.
    pub fn value_at(&self, row: usize) -> f64 {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).copied().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// Date-time of a DateTime/Month/Day column; `None` otherwise.
    pub fn date_time_at(&self, row: usize) -> Option<NaiveDateTime> {
        match &self.data {
            ColumnData::DateTime(v) => v.get(row).copied().flatten(),
            _ => None,
        }
    }

    /// Typed cell value, or the buffer default past the end.
    pub fn cell(&self, row: usize) -> CellValue {
        self.data.cell(row).unwrap_or(match self.data_type() {
            DataType::Double => CellValue::Number(f64::NAN),
            DataType::Text => CellValue::Text(String::new()),
            DataType::DateTime => CellValue::DateTime(None),
        })
    }

    /// The cell rendered through the output filter.
    pub fn display_text(&self, row: usize) -> String {
        match self.data.cell(row) {
            Some(value) => self.output_filter.render(&value),
            None => String::new(),
        }
    }

    /// Store a typed value at `row`, growing the column to `row + 1` if
    /// needed. Intervening rows get default values; validity is untouched.
    pub fn set_cell(&mut self, row: usize, value: CellValue) -> bool {
        let stored = self.data.set_cell(row, value);
        if !stored {
            tracing::warn!(column = %self.name, row, "cell type does not match column type");
        }
        stored
    }

    pub fn set_text_at(&mut self, row: usize, text: impl Into<String>) {
        self.set_cell(row, CellValue::Text(text.into()));
    }

    pub fn set_value_at(&mut self, row: usize, value: f64) {
        self.set_cell(row, CellValue::Number(value));
    }

    pub fn set_date_time_at(&mut self, row: usize, value: Option<NaiveDateTime>) {
        self.set_cell(row, CellValue::DateTime(value));
    }

    /// Overwrite a contiguous run starting at `first`, growing as needed.
    pub fn replace_run(&mut self, first: usize, values: &ColumnData) -> bool {
        let stored = self.data.overwrite(first, values);
        if !stored {
            tracing::warn!(column = %self.name, first, "run type does not match column type");
        }
        stored
    }

    pub fn replace_texts(&mut self, first: usize, values: Vec<String>) {
        self.replace_run(first, &ColumnData::Text(values));
    }

    pub fn replace_values(&mut self, first: usize, values: Vec<f64>) {
        self.replace_run(first, &ColumnData::Numeric(values));
    }

    pub fn replace_date_times(&mut self, first: usize, values: Vec<Option<NaiveDateTime>>) {
        self.replace_run(first, &ColumnData::DateTime(values));
    }
}
