//! The column facade.
//!
//! [`Column`] is the identity the rest of the application holds on to. Every
//! mutator builds the matching command and pushes it onto an [`UndoStack`],
//! which applies it immediately; every accessor reads the storage directly.
//! Mode changes and buffer swaps replace what sits behind the facade but
//! never its [`ColumnId`], so identity-based lookups stay valid across undo.

use std::cell::Ref;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDateTime;
use datacol_engine::{
    CellValue, ColumnData, ColumnMode, ColumnStorage, DataType, Interval, IntervalAttribute,
    OutputFilter, PlotDesignation,
};

use crate::commands::{
    ClearColumnCommand, ColumnRef, DescriptionCommand, DescriptionField, FlagChange, FlagCommand,
    FlagKind, FormulaChange, FormulaCommand, FullCopyCommand, InsertEmptyRowsCommand,
    PartialCopyCommand, RemoveRowsCommand, ReplaceRunCommand, SetCellCommand, SetModeCommand,
    SetPlotDesignationCommand,
};
use crate::history::UndoStack;
use crate::snapshot::ColumnSnapshot;

static NEXT_COLUMN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique column identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(u64);

impl ColumnId {
    pub fn next() -> ColumnId {
        ColumnId(NEXT_COLUMN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A column. Clones share the same storage and identity.
#[derive(Clone, Debug)]
pub struct Column {
    inner: ColumnRef,
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Column {}

impl Column {
    /// A new, empty column.
    pub fn new(name: impl Into<String>, mode: ColumnMode) -> Self {
        Self::from_storage(ColumnStorage::new(name, mode))
    }

    pub fn from_storage(storage: ColumnStorage) -> Self {
        Column {
            inner: ColumnRef::new(ColumnId::next(), storage),
        }
    }

    pub fn from_snapshot(snapshot: ColumnSnapshot) -> Self {
        Self::from_storage(snapshot.into_storage())
    }

    pub fn snapshot(&self) -> ColumnSnapshot {
        ColumnSnapshot::capture(&self.storage())
    }

    pub fn id(&self) -> ColumnId {
        self.inner.id()
    }

    /// Read access to the storage. Do not hold this across a mutator call.
    pub fn storage(&self) -> Ref<'_, ColumnStorage> {
        self.inner.borrow()
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn name(&self) -> String {
        self.storage().name().to_string()
    }

    pub fn comment(&self) -> String {
        self.storage().comment().to_string()
    }

    pub fn mode(&self) -> ColumnMode {
        self.storage().mode()
    }

    pub fn data_type(&self) -> DataType {
        self.storage().data_type()
    }

    pub fn plot_designation(&self) -> PlotDesignation {
        self.storage().plot_designation()
    }

    pub fn row_count(&self) -> usize {
        self.storage().row_count()
    }

    pub fn text_at(&self, row: usize) -> String {
        self.storage().text_at(row)
    }

    pub fn value_at(&self, row: usize) -> f64 {
        self.storage().value_at(row)
    }

    pub fn date_time_at(&self, row: usize) -> Option<NaiveDateTime> {
        self.storage().date_time_at(row)
    }

    pub fn cell(&self, row: usize) -> CellValue {
        self.storage().cell(row)
    }

    pub fn display_text(&self, row: usize) -> String {
        self.storage().display_text(row)
    }

    pub fn is_invalid(&self, row: usize) -> bool {
        self.storage().is_invalid(row)
    }

    pub fn is_masked(&self, row: usize) -> bool {
        self.storage().is_masked(row)
    }

    pub fn formula(&self, row: usize) -> String {
        self.storage().formula(row).to_string()
    }

    pub fn formulas(&self) -> IntervalAttribute<String> {
        self.storage().formulas().clone()
    }

    // ---------------------------------------------------------------------
    // Mutators
    // ---------------------------------------------------------------------

    /// Switch to `mode` with its default display format.
    pub fn set_mode(&self, stack: &mut UndoStack, mode: ColumnMode) {
        self.set_mode_with_filter(stack, mode, OutputFilter::for_mode(mode));
    }

    /// Switch to `mode`, rendering with `output_filter` afterwards.
    /// Does nothing when the column already has that mode.
    pub fn set_mode_with_filter(&self, stack: &mut UndoStack, mode: ColumnMode, output_filter: OutputFilter) {
        if self.mode() == mode {
            return;
        }
        stack.push(Box::new(SetModeCommand::new(self.inner.clone(), mode, output_filter)));
    }

    /// Replace data and validity with a copy of `source`'s. Returns `false`
    /// without recording anything when the buffer types differ.
    pub fn copy(&self, stack: &mut UndoStack, source: &Column) -> bool {
        if self.data_type() != source.data_type() {
            return false;
        }
        stack.push(Box::new(FullCopyCommand::new(self.inner.clone(), source.inner.clone())));
        true
    }

    /// Copy `count` rows of `source` starting at `src_start` to `dest_start`.
    /// Returns `false` when the buffer types differ.
    pub fn copy_rows(&self, stack: &mut UndoStack, source: &Column, src_start: usize, dest_start: usize, count: usize) -> bool {
        if self.data_type() != source.data_type() {
            return false;
        }
        if count == 0 || src_start >= source.row_count() {
            return true;
        }
        stack.push(Box::new(PartialCopyCommand::new(
            self.inner.clone(),
            source.inner.clone(),
            src_start,
            dest_start,
            count,
        )));
        true
    }

    pub fn insert_rows(&self, stack: &mut UndoStack, before: usize, count: usize) {
        if count > 0 {
            stack.push(Box::new(InsertEmptyRowsCommand::new(self.inner.clone(), before, count)));
        }
    }

    /// Remove up to `count` rows from `first`; ranges past the end are clamped.
    pub fn remove_rows(&self, stack: &mut UndoStack, first: usize, count: usize) {
        if self.storage().removable_rows(first, count) > 0 {
            stack.push(Box::new(RemoveRowsCommand::new(self.inner.clone(), first, count)));
        }
    }

    pub fn set_plot_designation(&self, stack: &mut UndoStack, designation: PlotDesignation) {
        stack.push(Box::new(SetPlotDesignationCommand::new(self.inner.clone(), designation)));
    }

    pub fn set_name(&self, stack: &mut UndoStack, name: impl Into<String>) {
        stack.push(Box::new(DescriptionCommand::new(
            self.inner.clone(),
            DescriptionField::Name,
            name,
        )));
    }

    pub fn set_comment(&self, stack: &mut UndoStack, comment: impl Into<String>) {
        stack.push(Box::new(DescriptionCommand::new(
            self.inner.clone(),
            DescriptionField::Comment,
            comment,
        )));
    }

    /// Remove all rows, keeping the mode.
    pub fn clear(&self, stack: &mut UndoStack) {
        stack.push(Box::new(ClearColumnCommand::new(self.inner.clone())));
    }

    pub fn clear_validity(&self, stack: &mut UndoStack) {
        self.push_flags(stack, FlagKind::Validity, FlagChange::Clear);
    }

    pub fn clear_masks(&self, stack: &mut UndoStack) {
        self.push_flags(stack, FlagKind::Masking, FlagChange::Clear);
    }

    pub fn set_invalid(&self, stack: &mut UndoStack, interval: Interval, invalid: bool) {
        self.push_flags(stack, FlagKind::Validity, FlagChange::Set(interval, invalid));
    }

    pub fn set_masked(&self, stack: &mut UndoStack, interval: Interval, masked: bool) {
        self.push_flags(stack, FlagKind::Masking, FlagChange::Set(interval, masked));
    }

    fn push_flags(&self, stack: &mut UndoStack, kind: FlagKind, change: FlagChange) {
        stack.push(Box::new(FlagCommand::new(self.inner.clone(), kind, change)));
    }

    /// Set `formula` over `interval`; an empty formula removes it there.
    pub fn set_formula(&self, stack: &mut UndoStack, interval: Interval, formula: impl Into<String>) {
        stack.push(Box::new(FormulaCommand::new(
            self.inner.clone(),
            FormulaChange::Set(interval, formula.into()),
        )));
    }

    pub fn clear_formulas(&self, stack: &mut UndoStack) {
        stack.push(Box::new(FormulaCommand::new(self.inner.clone(), FormulaChange::Clear)));
    }

    pub fn set_text_at(&self, stack: &mut UndoStack, row: usize, text: impl Into<String>) {
        self.set_cell(stack, row, CellValue::Text(text.into()));
    }

    pub fn set_value_at(&self, stack: &mut UndoStack, row: usize, value: f64) {
        self.set_cell(stack, row, CellValue::Number(value));
    }

    pub fn set_date_time_at(&self, stack: &mut UndoStack, row: usize, value: Option<NaiveDateTime>) {
        self.set_cell(stack, row, CellValue::DateTime(value));
    }

    /// Set one cell. The value must match the column's buffer type.
    pub fn set_cell(&self, stack: &mut UndoStack, row: usize, value: CellValue) {
        stack.push(Box::new(SetCellCommand::new(self.inner.clone(), row, value)));
    }

    pub fn replace_texts(&self, stack: &mut UndoStack, first: usize, values: Vec<String>) {
        self.replace_run(stack, first, ColumnData::Text(values));
    }

    pub fn replace_values(&self, stack: &mut UndoStack, first: usize, values: Vec<f64>) {
        self.replace_run(stack, first, ColumnData::Numeric(values));
    }

    pub fn replace_date_times(&self, stack: &mut UndoStack, first: usize, values: Vec<Option<NaiveDateTime>>) {
        self.replace_run(stack, first, ColumnData::DateTime(values));
    }

    fn replace_run(&self, stack: &mut UndoStack, first: usize, values: ColumnData) {
        if !values.is_empty() {
            stack.push(Box::new(ReplaceRunCommand::new(self.inner.clone(), first, values)));
        }
    }

    /// Enter user text into `row`. Non-text columns parse it through their
    /// input filter; a failed parse stores the type's default value and marks
    /// the row invalid, a successful one marks it valid.
    pub fn enter_text(&self, stack: &mut UndoStack, row: usize, text: &str) {
        let (data_type, filter) = {
            let storage = self.storage();
            (storage.data_type(), storage.input_filter())
        };
        if data_type == DataType::Text {
            self.set_text_at(stack, row, text);
            return;
        }
        let parsed = filter.parse(text);
        let invalid = parsed.is_none();
        let value = parsed.unwrap_or(match data_type {
            DataType::Double => CellValue::Number(0.0),
            _ => CellValue::DateTime(None),
        });
        stack.with_macro(format!("enter text in column {}", self.name()), |stack| {
            self.set_cell(stack, row, value);
            if self.is_invalid(row) != invalid {
                self.set_invalid(stack, Interval::single(row), invalid);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ColumnEvent, EventCollector};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn numeric(values: &[f64]) -> (Column, UndoStack) {
        let column = Column::new("x", ColumnMode::Numeric);
        let mut stack = UndoStack::new();
        column.replace_values(&mut stack, 0, values.to_vec());
        stack.clear();
        (column, stack)
    }

    fn undo_all(stack: &mut UndoStack) {
        while stack.can_undo() {
            stack.undo().unwrap();
        }
    }

    #[test]
    fn test_identity_survives_mode_change() {
        let (column, mut stack) = numeric(&[1.0, 2.0]);
        let alias = column.clone();
        let id = column.id();
        column.set_mode(&mut stack, ColumnMode::Text);
        assert_eq!(alias.id(), id);
        assert_eq!(alias.text_at(1), "2");
        stack.undo().unwrap();
        assert_eq!(alias, column);
        assert_eq!(alias.mode(), ColumnMode::Numeric);
        assert_ne!(Column::new("x", ColumnMode::Numeric), column);
    }

    #[test]
    fn test_same_mode_is_not_recorded() {
        let (column, mut stack) = numeric(&[1.0]);
        column.set_mode(&mut stack, ColumnMode::Numeric);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_sequence_undoes_to_initial_state() {
        let (column, mut stack) = numeric(&[1.0, 2.0, 3.0, 4.0]);
        let initial = column.storage().clone();

        column.set_formula(&mut stack, Interval::new(0, 3), "i");
        column.set_masked(&mut stack, Interval::single(1), true);
        column.set_value_at(&mut stack, 6, 9.0);
        column.remove_rows(&mut stack, 1, 2);
        column.insert_rows(&mut stack, 0, 2);
        column.set_plot_designation(&mut stack, PlotDesignation::X);
        column.set_mode(&mut stack, ColumnMode::Text);
        column.set_text_at(&mut stack, 0, "hello");
        column.set_mode(&mut stack, ColumnMode::Numeric);
        column.clear_masks(&mut stack);
        column.clear(&mut stack);

        undo_all(&mut stack);
        assert_eq!(*column.storage(), initial);
    }

    #[test]
    fn test_run_replacers_for_text_and_date_time() {
        let mut stack = UndoStack::new();
        let names = Column::new("names", ColumnMode::Text);
        names.replace_texts(&mut stack, 1, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(names.row_count(), 3);
        assert_eq!(names.text_at(2), "c");

        let when = Column::new("when", ColumnMode::DateTime);
        let noon = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).and_then(|d| d.and_hms_opt(12, 0, 0));
        when.replace_date_times(&mut stack, 0, vec![noon, None]);
        assert_eq!(when.date_time_at(0), noon);
        assert_eq!(when.row_count(), 2);

        undo_all(&mut stack);
        assert_eq!(names.row_count(), 0);
        assert_eq!(when.row_count(), 0);
    }

    #[test]
    fn test_copy_requires_matching_types() {
        let (column, mut stack) = numeric(&[1.0]);
        let other = Column::new("t", ColumnMode::Text);
        assert!(!column.copy(&mut stack, &other));
        assert!(!column.copy_rows(&mut stack, &other, 0, 0, 1));
        assert!(stack.is_empty());

        let (source, _) = numeric(&[5.0, 6.0]);
        assert!(column.copy(&mut stack, &source));
        assert_eq!(column.row_count(), 2);
        assert!(column.copy_rows(&mut stack, &source, 1, 2, 1));
        assert_eq!(column.value_at(2), 6.0);
    }

    #[test]
    fn test_enter_text_parses_and_flags() {
        let (column, mut stack) = numeric(&[1.0]);
        column.enter_text(&mut stack, 0, "abc");
        assert!(column.is_invalid(0));
        assert_eq!(column.value_at(0), 0.0);

        column.enter_text(&mut stack, 0, "2.5");
        assert!(!column.is_invalid(0));
        assert_eq!(column.value_at(0), 2.5);

        stack.undo().unwrap();
        assert!(column.is_invalid(0));
        assert_eq!(stack.undo_text(), Some("enter text in column x"));

        let day = Column::new("d", ColumnMode::Day);
        day.enter_text(&mut stack, 0, "Wednesday");
        assert_eq!(day.display_text(0), "Wednesday");
    }

    #[test]
    fn test_remove_then_undo_twenty_rows() {
        let values: Vec<f64> = (0..20).map(f64::from).collect();
        let (column, mut stack) = numeric(&values);
        column.set_masked(&mut stack, Interval::new(5, 9), true);
        column.set_formula(&mut stack, Interval::new(7, 8), "i");
        stack.clear();

        column.remove_rows(&mut stack, 5, 5);
        assert_eq!(column.row_count(), 15);
        stack.undo().unwrap();
        assert_eq!(column.row_count(), 20);
        assert_eq!(column.value_at(9), 9.0);
        assert!(column.is_masked(5));
        assert_eq!(column.formula(8), "i");
    }

    #[test]
    fn test_events_are_keyed_by_identity() {
        let collector = Rc::new(RefCell::new(EventCollector::new()));
        let column = Column::new("x", ColumnMode::Numeric);
        let mut stack = UndoStack::with_sink(collector.clone());
        column.insert_rows(&mut stack, 0, 3);
        column.set_mode(&mut stack, ColumnMode::DateTime);
        stack.undo().unwrap();

        let events = collector.borrow().events().to_vec();
        assert_eq!(
            events,
            vec![
                ColumnEvent::RowsInserted {
                    column: column.id(),
                    first: 0,
                    count: 3
                },
                ColumnEvent::ColumnReplaced { column: column.id() },
                ColumnEvent::ColumnReplaced { column: column.id() },
            ]
        );
    }
}
