//! Undoable column commands.
//!
//! One command type per mutating operation. A command is constructed fresh,
//! then driven by [`UndoStack`](crate::history::UndoStack) through strictly
//! alternating `redo()` / `undo()` calls, starting with `redo()`.
//!
//! The first `redo()` captures whatever pre-state the inverse needs. From
//! then on redo and undo toggle state between the command and the storage
//! (usually by swapping owned values), so replaying the history never
//! re-snapshots.

mod attrs;
mod cells;
mod copy;
mod mode;
mod rows;

pub use attrs::{
    ClearColumnCommand, DescriptionCommand, DescriptionField, FlagChange, FlagCommand, FlagKind,
    FormulaChange, FormulaCommand, SetPlotDesignationCommand,
};
pub use cells::{ReplaceRunCommand, SetCellCommand};
pub use copy::{FullCopyCommand, PartialCopyCommand};
pub use mode::SetModeCommand;
pub use rows::{InsertEmptyRowsCommand, RemoveRowsCommand};

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use datacol_engine::{ColumnStorage, DataAndValidity};

use crate::column::ColumnId;
use crate::events::{ChangeSink, ColumnEvent};

/// A reversible mutation.
pub trait UndoCommand {
    /// Human-readable description, e.g. "change mode of column x".
    fn text(&self) -> &str;

    fn redo(&mut self, sink: &mut dyn ChangeSink);

    fn undo(&mut self, sink: &mut dyn ChangeSink);
}

/// Shared handle to a column's storage, tagged with the column identity.
///
/// `Rc<RefCell<..>>` keeps the model single-threaded: the handle is neither
/// `Send` nor `Sync`, so callers on several threads must serialize access
/// themselves.
#[derive(Clone, Debug)]
pub struct ColumnRef {
    id: ColumnId,
    storage: Rc<RefCell<ColumnStorage>>,
}

impl ColumnRef {
    pub fn new(id: ColumnId, storage: ColumnStorage) -> Self {
        ColumnRef {
            id,
            storage: Rc::new(RefCell::new(storage)),
        }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn borrow(&self) -> Ref<'_, ColumnStorage> {
        self.storage.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, ColumnStorage> {
        self.storage.borrow_mut()
    }

    pub fn name(&self) -> String {
        self.storage.borrow().name().to_string()
    }

    fn changed(&self, sink: &mut dyn ChangeSink, rows: Option<datacol_engine::Interval>) {
        sink.notify(ColumnEvent::DataChanged {
            column: self.id,
            rows,
        });
    }
}

/// Swap buffer and validity with `slot`. Used by commands that toggle a
/// whole buffer in and out (full copy, clear).
fn swap_data(column: &ColumnRef, slot: &mut Option<DataAndValidity>) {
    if let Some((data, validity)) = slot.take() {
        *slot = Some(column.borrow_mut().replace_data(data, validity));
    }
}

/// Several commands applied and reverted as one step.
pub struct MacroCommand {
    text: String,
    commands: Vec<Box<dyn UndoCommand>>,
}

impl MacroCommand {
    pub fn new(text: impl Into<String>) -> Self {
        MacroCommand {
            text: text.into(),
            commands: Vec::new(),
        }
    }

    /// Append an already-applied command.
    pub fn push(&mut self, command: Box<dyn UndoCommand>) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl UndoCommand for MacroCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        for command in self.commands.iter_mut() {
            command.redo(sink);
        }
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        for command in self.commands.iter_mut().rev() {
            command.undo(sink);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::events::EventCollector;
    use datacol_engine::ColumnMode;

    pub fn numeric(values: &[f64]) -> ColumnRef {
        let mut storage = ColumnStorage::new("x", ColumnMode::Numeric);
        storage.replace_values(0, values.to_vec());
        ColumnRef::new(ColumnId::next(), storage)
    }

    pub fn text(values: &[&str]) -> ColumnRef {
        let mut storage = ColumnStorage::new("t", ColumnMode::Text);
        storage.replace_texts(0, values.iter().map(|s| s.to_string()).collect());
        ColumnRef::new(ColumnId::next(), storage)
    }

    /// Runs redo, undo, redo and checks the states against a single redo.
    pub fn check_cycle(column: &ColumnRef, command: &mut dyn UndoCommand) -> EventCollector {
        let mut sink = EventCollector::new();
        let before = column.borrow().clone();
        command.redo(&mut sink);
        let after = column.borrow().clone();
        command.undo(&mut sink);
        assert_eq!(*column.borrow(), before, "undo of '{}'", command.text());
        command.redo(&mut sink);
        assert_eq!(*column.borrow(), after, "redo of '{}'", command.text());
        sink
    }
}
