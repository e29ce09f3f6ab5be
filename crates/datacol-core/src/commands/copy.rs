use datacol_engine::{ColumnStorage, DataAndValidity, Interval, IntervalAttribute};

use super::{ColumnRef, UndoCommand, swap_data};
use crate::events::ChangeSink;

/// Replace a column's data and validity with a copy of another column's.
///
/// The source is cloned once; after that redo and undo exchange the two
/// buffers without copying.
pub struct FullCopyCommand {
    column: ColumnRef,
    source: ColumnRef,
    backup: Option<DataAndValidity>,
    text: String,
}

impl FullCopyCommand {
    pub fn new(column: ColumnRef, source: ColumnRef) -> Self {
        let text = format!("copy {} to {}", source.name(), column.name());
        FullCopyCommand {
            column,
            source,
            backup: None,
            text,
        }
    }
}

impl UndoCommand for FullCopyCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        if self.backup.is_none() {
            self.backup = Some(self.source.borrow().clone_data());
        }
        swap_data(&self.column, &mut self.backup);
        self.column.changed(sink, None);
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        swap_data(&self.column, &mut self.backup);
        self.column.changed(sink, None);
    }
}

/// Copy a row range from one column into another (or the same) column.
pub struct PartialCopyCommand {
    column: ColumnRef,
    source: ColumnRef,
    src_start: usize,
    dest_start: usize,
    count: usize,
    backup: Option<PartialBackup>,
    text: String,
}

struct PartialBackup {
    /// Source rows being copied, taken before anything is written.
    source_rows: ColumnStorage,
    /// Destination rows that existed in the overwritten range.
    dest_rows: ColumnStorage,
    dest_validity: IntervalAttribute<bool>,
    old_row_count: usize,
}

impl PartialCopyCommand {
    pub fn new(column: ColumnRef, source: ColumnRef, src_start: usize, dest_start: usize, count: usize) -> Self {
        let text = format!("copy {} to {}", source.name(), column.name());
        PartialCopyCommand {
            column,
            source,
            src_start,
            dest_start,
            count,
            backup: None,
            text,
        }
    }

    fn range(&self, rows: usize) -> Option<Interval> {
        Interval::from_len(self.dest_start, rows)
    }
}

impl UndoCommand for PartialCopyCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        if self.backup.is_none() {
            let source_rows = self.source.borrow().slice(self.src_start, self.count);
            let dest = self.column.borrow();
            self.backup = Some(PartialBackup {
                dest_rows: dest.slice(self.dest_start, source_rows.row_count()),
                dest_validity: dest.validity().clone(),
                old_row_count: dest.row_count(),
                source_rows,
            });
        }
        let Some(backup) = &self.backup else {
            return;
        };
        let rows = backup.source_rows.row_count();
        self.column
            .borrow_mut()
            .copy_from(&backup.source_rows, 0, self.dest_start, rows);
        self.column.changed(sink, self.range(rows));
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        let Some(backup) = &self.backup else {
            return;
        };
        {
            let mut dest = self.column.borrow_mut();
            dest.copy_from(&backup.dest_rows, 0, self.dest_start, backup.dest_rows.row_count());
            dest.resize_to(backup.old_row_count);
            dest.replace_validity(backup.dest_validity.clone());
        }
        self.column
            .changed(sink, self.range(backup.source_rows.row_count()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use datacol_engine::ColumnData;

    #[test]
    fn test_full_copy_cycle() {
        let dest = numeric(&[1.0, 2.0]);
        let source = numeric(&[7.0, 8.0, 9.0]);
        source.borrow_mut().set_invalid(Interval::single(2), true);

        let mut command = FullCopyCommand::new(dest.clone(), source.clone());
        check_cycle(&dest, &mut command);
        assert_eq!(dest.borrow().data(), source.borrow().data());
        assert!(dest.borrow().is_invalid(2));
        // the source is untouched
        assert_eq!(source.borrow().row_count(), 3);
    }

    #[test]
    fn test_partial_copy_growing_destination() {
        let dest = numeric(&[1.0, 2.0]);
        let source = numeric(&[7.0, 8.0, 9.0]);
        source.borrow_mut().set_invalid(Interval::single(1), true);

        let mut command = PartialCopyCommand::new(dest.clone(), source.clone(), 1, 1, 5);
        check_cycle(&dest, &mut command);
        assert_eq!(dest.borrow().data(), &ColumnData::Numeric(vec![1.0, 8.0, 9.0]));
        assert!(dest.borrow().is_invalid(1));

        command.undo(&mut crate::events::NullSink);
        assert_eq!(dest.borrow().data(), &ColumnData::Numeric(vec![1.0, 2.0]));
        assert!(dest.borrow().validity().is_empty());
    }

    #[test]
    fn test_partial_copy_within_one_column() {
        let column = numeric(&[0.0, 1.0, 2.0, 3.0]);
        let mut command = PartialCopyCommand::new(column.clone(), column.clone(), 0, 1, 3);
        check_cycle(&column, &mut command);
        assert_eq!(
            column.borrow().data(),
            &ColumnData::Numeric(vec![0.0, 0.0, 1.0, 2.0])
        );
    }
}
