use datacol_engine::{CellValue, ColumnData, Interval};

use super::{ColumnRef, UndoCommand};
use crate::events::ChangeSink;

/// Set one cell. Setting past the end grows the column to `row + 1`; undo
/// shrinks it back.
pub struct SetCellCommand {
    column: ColumnRef,
    row: usize,
    value: CellValue,
    /// Old cell value and row count.
    old: Option<(CellValue, usize)>,
    text: String,
}

impl SetCellCommand {
    pub fn new(column: ColumnRef, row: usize, value: CellValue) -> Self {
        let text = format!("set cell {} of column {}", row.saturating_add(1), column.name());
        SetCellCommand {
            column,
            row,
            value,
            old: None,
            text,
        }
    }
}

impl UndoCommand for SetCellCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        {
            let mut storage = self.column.borrow_mut();
            if self.old.is_none() {
                self.old = Some((storage.cell(self.row), storage.row_count()));
            }
            storage.set_cell(self.row, self.value.clone());
        }
        self.column.changed(sink, Some(Interval::single(self.row)));
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        if let Some((value, row_count)) = &self.old {
            let mut storage = self.column.borrow_mut();
            if self.row < *row_count {
                storage.set_cell(self.row, value.clone());
            }
            storage.resize_to(*row_count);
        }
        self.column.changed(sink, Some(Interval::single(self.row)));
    }
}

/// Overwrite a contiguous run of cells starting at `first`.
pub struct ReplaceRunCommand {
    column: ColumnRef,
    first: usize,
    values: ColumnData,
    /// Cells previously in the run (only those that existed) and the row count.
    old: Option<(ColumnData, usize)>,
    text: String,
}

impl ReplaceRunCommand {
    pub fn new(column: ColumnRef, first: usize, values: ColumnData) -> Self {
        let text = format!("replace values of column {}", column.name());
        ReplaceRunCommand {
            column,
            first,
            values,
            old: None,
            text,
        }
    }

    fn rows(&self) -> Option<Interval> {
        Interval::from_len(self.first, self.values.len())
    }
}

impl UndoCommand for ReplaceRunCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        {
            let mut storage = self.column.borrow_mut();
            if self.old.is_none() {
                let run = storage.data().slice(self.first, self.values.len());
                self.old = Some((run, storage.row_count()));
            }
            storage.replace_run(self.first, &self.values);
        }
        self.column.changed(sink, self.rows());
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        if let Some((run, row_count)) = &self.old {
            let mut storage = self.column.borrow_mut();
            storage.replace_run(self.first, run);
            storage.resize_to(*row_count);
        }
        self.column.changed(sink, self.rows());
    }
}
