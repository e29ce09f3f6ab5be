//! An ordered set of columns sharing one undo history.
//!
//! The table adds the operations that span columns: formula recalculation,
//! applying a formula to a selection, renaming a column (and the formulas
//! that refer to it), and row insertion/removal across all columns. Each of
//! these is recorded as one macro.

use datacol_engine::{
    ColumnMode, ColumnStorage, DataType, EvalError, FormulaEvaluator, FormulaValue, Interval,
    OutputFilter, RhaiEvaluator, column_to_dynamic,
};
use tracing::{debug, warn};

use crate::column::Column;
use crate::error::{DatacolError, Result};
use crate::events::ColumnEvent;
use crate::history::UndoStack;
use crate::settings::Settings;
use crate::snapshot::TableSnapshot;

/// Columns and rows an operation applies to. `None` means all of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    columns: Option<Vec<usize>>,
    rows: Option<Interval>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(columns: impl IntoIterator<Item = usize>) -> Self {
        Selection {
            columns: Some(columns.into_iter().collect()),
            rows: None,
        }
    }

    pub fn with_rows(mut self, rows: Interval) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn rows(&self) -> Option<Interval> {
        self.rows
    }

    fn column_indices(&self, count: usize) -> Vec<usize> {
        match &self.columns {
            Some(columns) => columns.iter().copied().filter(|&c| c < count).collect(),
            None => (0..count).collect(),
        }
    }
}

/// Outcome of a recalculation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecalcSummary {
    pub evaluated: usize,
    pub failed: usize,
}

pub struct Table {
    name: String,
    columns: Vec<Column>,
    stack: UndoStack,
    settings: Settings,
}

impl Table {
    pub fn new(name: impl Into<String>, settings: Settings) -> Self {
        let mut stack = UndoStack::new();
        stack.set_max_depth(settings.history.max_depth);
        Table {
            name: name.into(),
            columns: Vec::new(),
            stack,
            settings,
        }
    }

    pub fn from_snapshot(snapshot: TableSnapshot, settings: Settings) -> Self {
        let mut table = Table::new(snapshot.name, settings);
        table.columns = snapshot.columns.into_iter().map(Column::from_snapshot).collect();
        table
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            name: self.name.clone(),
            columns: self.columns.iter().map(Column::snapshot).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Append a new empty column displayed with the table's settings.
    /// Adding columns is not recorded in the history.
    pub fn add_column(&mut self, name: impl Into<String>, mode: ColumnMode) -> Column {
        let mut storage = ColumnStorage::new(name, mode);
        storage.set_output_filter(self.settings.output_filter(mode));
        let column = Column::from_storage(storage);
        self.columns.push(column.clone());
        column
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Position of `column` in this table, by identity.
    pub fn column_index(&self, column: &Column) -> Option<usize> {
        self.columns.iter().position(|c| c.id() == column.id())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Row count of the longest column.
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Column::row_count).max().unwrap_or(0)
    }

    pub fn stack(&self) -> &UndoStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut UndoStack {
        &mut self.stack
    }

    /// Columns together with the history, for calling column mutators.
    pub fn parts_mut(&mut self) -> (&[Column], &mut UndoStack) {
        (&self.columns, &mut self.stack)
    }

    pub fn undo(&mut self) -> Result<()> {
        self.stack.undo()
    }

    pub fn redo(&mut self) -> Result<()> {
        self.stack.redo()
    }

    fn checked_column(&self, index: usize) -> Result<Column> {
        self.columns
            .get(index)
            .cloned()
            .ok_or_else(|| DatacolError::UnknownColumn(index.to_string()))
    }

    /// Change a column's mode, displaying it with the table's settings.
    pub fn set_column_mode(&mut self, index: usize, mode: ColumnMode) -> Result<()> {
        let column = self.checked_column(index)?;
        let filter = self.settings.output_filter(mode);
        column.set_mode_with_filter(&mut self.stack, mode, filter);
        Ok(())
    }

    /// Rename a column and rewrite every formula that refers to it as
    /// `"old"`, in one step.
    pub fn rename_column(&mut self, index: usize, name: &str) -> Result<()> {
        let column = self.checked_column(index)?;
        let old = column.name();
        if old == name {
            return Ok(());
        }
        let old_ref = format!("\"{}\"", old);
        let new_ref = format!("\"{}\"", name);
        let columns = &self.columns;
        self.stack
            .with_macro(format!("rename column {} to {}", old, name), |stack| {
                column.set_name(stack, name);
                for col in columns {
                    for (interval, formula) in col.formulas().entries() {
                        if formula.contains(&old_ref) {
                            col.set_formula(stack, *interval, formula.replace(&old_ref, &new_ref));
                        }
                    }
                }
            });
        Ok(())
    }

    /// Set `formula` on every current row of a column.
    pub fn set_column_formula(&mut self, index: usize, formula: &str) -> Result<()> {
        let column = self.checked_column(index)?;
        if let Some(rows) = Interval::from_len(0, column.row_count()) {
            column.set_formula(&mut self.stack, rows, formula);
        }
        Ok(())
    }

    /// Insert `count` empty rows before `before` in every column.
    pub fn insert_rows(&mut self, before: usize, count: usize) {
        let columns = &self.columns;
        self.stack.with_macro("insert rows", |stack| {
            for column in columns {
                column.insert_rows(stack, before, count);
            }
        });
    }

    /// Remove up to `count` rows from `first` in every column.
    pub fn remove_rows(&mut self, first: usize, count: usize) {
        let columns = &self.columns;
        self.stack.with_macro("remove rows", |stack| {
            for column in columns {
                column.remove_rows(stack, first, count);
            }
        });
    }

    /// Evaluate the formulas of the selected cells and store the results.
    ///
    /// Failures leave the cell untouched, are reported as
    /// [`ColumnEvent::EvaluationFailed`] and do not stop the pass.
    pub fn recalculate(&mut self, evaluator: &mut dyn FormulaEvaluator, selection: &Selection) -> RecalcSummary {
        let columns = &self.columns;
        let number_format = self.settings.output_filter(ColumnMode::Numeric);
        self.stack.with_macro("recalculate", |stack| {
            recalculate_columns(columns, stack, evaluator, selection, &number_format)
        })
    }

    /// Set `formula` on the selected rows (all rows of each selected column
    /// when no rows are selected), then recalculate them.
    pub fn apply_formula(
        &mut self,
        evaluator: &mut dyn FormulaEvaluator,
        selection: &Selection,
        formula: &str,
    ) -> RecalcSummary {
        let columns = &self.columns;
        let number_format = self.settings.output_filter(ColumnMode::Numeric);
        self.stack.with_macro("apply formula", |stack| {
            for index in selection.column_indices(columns.len()) {
                let column = &columns[index];
                let rows = selection
                    .rows()
                    .or_else(|| Interval::from_len(0, column.row_count()));
                if let Some(rows) = rows {
                    column.set_formula(stack, rows, formula);
                }
            }
            recalculate_columns(columns, stack, evaluator, selection, &number_format)
        })
    }
}

fn recalculate_columns(
    columns: &[Column],
    stack: &mut UndoStack,
    evaluator: &mut dyn FormulaEvaluator,
    selection: &Selection,
    number_format: &OutputFilter,
) -> RecalcSummary {
    for column in columns {
        evaluator.publish_column(&column.name(), column_to_dynamic(&column.storage()));
    }

    // formula intervals may reach past the data; only rows of the table are evaluated
    let table_rows = columns.iter().map(Column::row_count).max().unwrap_or(0);
    let Some(existing) = Interval::from_len(0, table_rows) else {
        return RecalcSummary::default();
    };

    let mut summary = RecalcSummary::default();
    for index in selection.column_indices(columns.len()) {
        let column = &columns[index];
        let formulas = column.formulas();
        for (interval, formula) in formulas.entries() {
            let rows = match selection.rows() {
                Some(selected) => interval.intersection(&selected),
                None => Some(*interval),
            };
            let Some(rows) = rows.and_then(|rows| rows.intersection(&existing)) else {
                continue;
            };
            for row in rows.rows() {
                summary.evaluated += 1;
                match evaluator.evaluate(formula, row, index) {
                    Ok(value) => store_result(column, stack, row, value, number_format),
                    Err(e) => {
                        summary.failed += 1;
                        report_failure(column, stack, row, e);
                    }
                }
            }
        }
        // later columns see this column's new values
        evaluator.publish_column(&column.name(), column_to_dynamic(&column.storage()));
    }
    debug!(evaluated = summary.evaluated, failed = summary.failed, "recalculated");
    summary
}

fn store_result(column: &Column, stack: &mut UndoStack, row: usize, value: FormulaValue, number_format: &OutputFilter) {
    match value {
        FormulaValue::Number(v) if column.data_type() == DataType::Double => {
            column.set_value_at(stack, row, v);
            if column.is_invalid(row) {
                column.set_invalid(stack, Interval::single(row), false);
            }
        }
        FormulaValue::Number(v) => column.enter_text(stack, row, &number_format.format_number(v)),
        FormulaValue::Text(text) => column.enter_text(stack, row, &text),
    }
}

fn report_failure(column: &Column, stack: &mut UndoStack, row: usize, error: EvalError) {
    let message = error.to_string();
    warn!(column = %column.name(), row, error = %message, "formula evaluation failed");
    stack.notify(ColumnEvent::EvaluationFailed {
        column: column.id(),
        row,
        message,
    });
}

/// Rhai evaluator with optional user functions.
pub fn build_evaluator(functions: Option<&str>) -> Result<RhaiEvaluator> {
    match functions {
        None => Ok(RhaiEvaluator::new()),
        Some(script) => RhaiEvaluator::with_functions(script).map_err(|e| match e {
            EvalError::Compile(msg) => DatacolError::RhaiCompile(msg),
            other => DatacolError::Eval(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventCollector;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn table_with(values: &[f64]) -> Table {
        let mut table = Table::new("t", Settings::default());
        let x = table.add_column("x", ColumnMode::Numeric);
        table.add_column("y", ColumnMode::Numeric);
        x.replace_values(table.stack_mut(), 0, values.to_vec());
        table.stack_mut().clear();
        table
    }

    /// Fails on one row, echoes `row * 10 + column` elsewhere.
    struct Scripted {
        fail_row: usize,
    }

    impl FormulaEvaluator for Scripted {
        fn evaluate(&mut self, _formula: &str, row: usize, column: usize) -> std::result::Result<FormulaValue, EvalError> {
            if row == self.fail_row {
                return Err(EvalError::NoValue);
            }
            Ok(FormulaValue::Number((row * 10 + column) as f64))
        }
    }

    #[test]
    fn test_recalculate_continues_past_failures() {
        let collector = Rc::new(RefCell::new(EventCollector::new()));
        let mut table = table_with(&[1.0, 2.0, 3.0]);
        table.stack_mut().set_sink(collector.clone());
        let (columns, stack) = table.parts_mut();
        columns[1].replace_values(stack, 0, vec![0.0, 0.0, 0.0]);
        table.set_column_formula(1, "anything").unwrap();

        let summary = table.recalculate(&mut Scripted { fail_row: 1 }, &Selection::all());
        assert_eq!(summary, RecalcSummary { evaluated: 3, failed: 1 });
        let y = table.column(1).unwrap();
        assert_eq!(y.value_at(0), 1.0);
        assert_eq!(y.value_at(1), 0.0);
        assert_eq!(y.value_at(2), 21.0);
        assert_eq!(collector.borrow().failures().len(), 1);

        table.undo().unwrap();
        assert_eq!(table.column(1).unwrap().value_at(2), 0.0);
    }

    #[test]
    fn test_recalculate_stays_within_existing_rows() {
        let mut table = table_with(&[1.0, 2.0, 3.0]);
        let (columns, stack) = table.parts_mut();
        columns[0].set_formula(stack, Interval::new(0, 9), "i");

        let summary = table.recalculate(&mut RhaiEvaluator::new(), &Selection::all());
        assert_eq!(summary, RecalcSummary { evaluated: 3, failed: 0 });
        let x = table.column(0).unwrap();
        assert_eq!(x.row_count(), 3);
        assert_eq!(x.value_at(2), 3.0);
        assert_eq!(x.formula(9), "i");
    }

    #[test]
    fn test_apply_formula_with_rhai() {
        let mut table = table_with(&[1.0, 2.0, 3.0]);
        let mut evaluator = RhaiEvaluator::new();
        let selection = Selection::columns([1]).with_rows(Interval::new(0, 2));
        let summary = table.apply_formula(&mut evaluator, &selection, "col(\"x\", i) * 2.0");
        assert_eq!(summary.failed, 0);

        let y = table.column(1).unwrap();
        assert_eq!(y.value_at(2), 6.0);
        assert_eq!(y.formula(0), "col(\"x\", i) * 2.0");
        assert_eq!(table.stack().len(), 1);

        table.undo().unwrap();
        let y = table.column(1).unwrap();
        assert_eq!(y.row_count(), 0);
        assert!(y.formulas().is_empty());
    }

    #[test]
    fn test_text_results_go_through_input_filter() {
        let mut table = Table::new("t", Settings::default());
        let day = table.add_column("d", ColumnMode::Day);
        let label = table.add_column("label", ColumnMode::Text);
        day.insert_rows(table.stack_mut(), 0, 2);
        label.insert_rows(table.stack_mut(), 0, 2);

        let mut evaluator = RhaiEvaluator::new();
        table.apply_formula(&mut evaluator, &Selection::columns([0]), "if i == 1 { \"Friday\" } else { \"someday\" }");
        let day = table.column(0).unwrap();
        assert_eq!(day.display_text(0), "Friday");
        assert!(day.is_invalid(1));

        table.apply_formula(&mut evaluator, &Selection::columns([1]), "i.to_float() / 4.0");
        assert_eq!(table.column(1).unwrap().text_at(1), "0.5");
    }

    #[test]
    fn test_rename_rewrites_formulas() {
        let mut table = table_with(&[1.0, 2.0]);
        let (columns, stack) = table.parts_mut();
        columns[1].insert_rows(stack, 0, 2);
        table.set_column_formula(1, "col(\"x\", i) + 1").unwrap();

        table.rename_column(0, "speed").unwrap();
        let y = table.column(1).unwrap();
        assert_eq!(y.formula(0), "col(\"speed\", i) + 1");
        assert_eq!(table.column(0).unwrap().name(), "speed");

        table.undo().unwrap();
        assert_eq!(table.column(1).unwrap().formula(1), "col(\"x\", i) + 1");
        assert_eq!(table.column(0).unwrap().name(), "x");
        assert!(matches!(table.rename_column(9, "z"), Err(DatacolError::UnknownColumn(_))));
    }

    #[test]
    fn test_table_wide_rows_and_identity() {
        let mut table = table_with(&[1.0, 2.0, 3.0]);
        let (columns, stack) = table.parts_mut();
        columns[1].insert_rows(stack, 0, 3);
        table.insert_rows(1, 2);
        assert!(table.columns().iter().all(|c| c.row_count() == 5));
        table.remove_rows(0, 10);
        assert_eq!(table.row_count(), 0);
        table.undo().unwrap();
        table.undo().unwrap();
        assert_eq!(table.row_count(), 3);

        let y = table.column(1).unwrap().clone();
        table.set_column_mode(1, ColumnMode::Text).unwrap();
        assert_eq!(table.column_index(&y), Some(1));
        assert_eq!(table.column_index(&Column::new("y", ColumnMode::Numeric)), None);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut table = table_with(&[1.0, 2.5]);
        table.rename_column(1, "renamed").unwrap();
        let restored = Table::from_snapshot(table.snapshot(), Settings::default());
        assert_eq!(restored.snapshot(), table.snapshot());
        assert!(restored.column_by_name("renamed").is_some());
        assert!(restored.stack().is_empty());
    }

    #[test]
    fn test_build_evaluator_reports_bad_functions() {
        assert!(build_evaluator(None).is_ok());
        assert!(matches!(build_evaluator(Some("fn (")), Err(DatacolError::RhaiCompile(_))));
    }
}
