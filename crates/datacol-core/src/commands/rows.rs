use datacol_engine::{ColumnStorage, IntervalAttribute};

use super::{ColumnRef, UndoCommand};
use crate::events::{ChangeSink, ColumnEvent};

pub struct InsertEmptyRowsCommand {
    column: ColumnRef,
    before: usize,
    count: usize,
    /// Where the rows actually went; `before` is clamped to the row count.
    inserted_at: usize,
    text: String,
}

impl InsertEmptyRowsCommand {
    pub fn new(column: ColumnRef, before: usize, count: usize) -> Self {
        let text = format!("insert rows into column {}", column.name());
        InsertEmptyRowsCommand {
            column,
            before,
            count,
            inserted_at: before,
            text,
        }
    }
}

impl UndoCommand for InsertEmptyRowsCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        self.inserted_at = self
            .column
            .borrow_mut()
            .insert_empty_rows(self.before, self.count);
        sink.notify(ColumnEvent::RowsInserted {
            column: self.column.id(),
            first: self.inserted_at,
            count: self.count,
        });
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        let removed = self
            .column
            .borrow_mut()
            .remove_rows(self.inserted_at, self.count);
        sink.notify(ColumnEvent::RowsRemoved {
            column: self.column.id(),
            first: self.inserted_at,
            count: removed,
        });
    }
}

/// Remove a row range. Ranges reaching past the end are clamped; the
/// clamped count is what undo re-inserts.
pub struct RemoveRowsCommand {
    column: ColumnRef,
    first: usize,
    count: usize,
    backup: Option<RemovedRows>,
    text: String,
}

struct RemovedRows {
    /// Data and validity of the removed rows.
    rows: ColumnStorage,
    masking: IntervalAttribute<bool>,
    formulas: IntervalAttribute<String>,
    removed: usize,
}

impl RemoveRowsCommand {
    pub fn new(column: ColumnRef, first: usize, count: usize) -> Self {
        let text = format!("remove rows from column {}", column.name());
        RemoveRowsCommand {
            column,
            first,
            count,
            backup: None,
            text,
        }
    }

    /// Rows actually removed by the last redo.
    pub fn removed(&self) -> usize {
        self.backup.as_ref().map_or(0, |b| b.removed)
    }
}

impl UndoCommand for RemoveRowsCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        {
            let mut storage = self.column.borrow_mut();
            if self.backup.is_none() {
                let removed = storage.removable_rows(self.first, self.count);
                self.backup = Some(RemovedRows {
                    rows: storage.slice(self.first, removed),
                    masking: storage.masking().clone(),
                    formulas: storage.formulas().clone(),
                    removed,
                });
            }
            storage.remove_rows(self.first, self.removed());
        }
        sink.notify(ColumnEvent::RowsRemoved {
            column: self.column.id(),
            first: self.first,
            count: self.removed(),
        });
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        let Some(backup) = &self.backup else {
            return;
        };
        {
            let mut storage = self.column.borrow_mut();
            storage.insert_empty_rows(self.first, backup.removed);
            storage.copy_from(&backup.rows, 0, self.first, backup.removed);
            storage.replace_masking(backup.masking.clone());
            storage.replace_formulas(backup.formulas.clone());
        }
        sink.notify(ColumnEvent::RowsInserted {
            column: self.column.id(),
            first: self.first,
            count: backup.removed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use datacol_engine::{ColumnData, Interval};

    #[test]
    fn test_remove_middle_range_restores_attributes() {
        let values: Vec<f64> = (0..20).map(f64::from).collect();
        let column = numeric(&values);
        {
            let mut storage = column.borrow_mut();
            storage.set_masked(Interval::new(6, 7), true);
            storage.set_formula(Interval::new(4, 12), "i * 2");
            storage.set_invalid(Interval::single(9), true);
        }

        let mut command = RemoveRowsCommand::new(column.clone(), 5, 5);
        let sink = check_cycle(&column, &mut command);
        assert_eq!(command.removed(), 5);
        assert_eq!(column.borrow().row_count(), 15);
        assert_eq!(column.borrow().value_at(5), 10.0);
        assert_eq!(
            sink.events()[0],
            ColumnEvent::RowsRemoved {
                column: column.id(),
                first: 5,
                count: 5
            }
        );

        command.undo(&mut crate::events::NullSink);
        let storage = column.borrow();
        assert_eq!(storage.row_count(), 20);
        assert_eq!(storage.data(), &ColumnData::Numeric(values));
        assert!(storage.is_masked(6) && storage.is_masked(7));
        assert!(storage.is_invalid(9));
        assert_eq!(storage.formula(12), "i * 2");
    }

    #[test]
    fn test_remove_past_end_round_trips_row_count() {
        let column = numeric(&[0.0, 1.0, 2.0, 3.0]);
        let mut command = RemoveRowsCommand::new(column.clone(), 2, 10);
        check_cycle(&column, &mut command);
        assert_eq!(command.removed(), 2);
        command.undo(&mut crate::events::NullSink);
        assert_eq!(column.borrow().row_count(), 4);
    }

    #[test]
    fn test_insert_empty_rows() {
        let column = numeric(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let mut command = InsertEmptyRowsCommand::new(column.clone(), 2, 3);
        check_cycle(&column, &mut command);
        assert_eq!(column.borrow().row_count(), 8);
        assert_eq!(column.borrow().value_at(5), 2.0);

        command.undo(&mut crate::events::NullSink);
        assert_eq!(
            column.borrow().data(),
            &ColumnData::Numeric(vec![0.0, 1.0, 2.0, 3.0, 4.0])
        );
    }

    #[test]
    fn test_insert_past_end_records_actual_position() {
        let column = numeric(&[0.0, 1.0]);
        let mut command = InsertEmptyRowsCommand::new(column.clone(), 9, 2);
        let sink = check_cycle(&column, &mut command);
        assert_eq!(
            sink.events()[0],
            ColumnEvent::RowsInserted {
                column: column.id(),
                first: 2,
                count: 2
            }
        );
    }
}
