//! Linear undo/redo history.
//!
//! Pushing a command applies it immediately. Pushing after an undo discards
//! every undone command above the current position; there is no redo tree.

use tracing::debug;

use crate::commands::{MacroCommand, UndoCommand};
use crate::error::{DatacolError, Result};
use crate::events::{ChangeSink, ColumnEvent, NullSink};

/// Default maximum number of undo entries to keep.
pub const DEFAULT_MAX_DEPTH: usize = 100;

pub struct UndoStack {
    commands: Vec<Box<dyn UndoCommand>>,
    /// Number of commands currently applied; `commands[..index]` can be undone.
    index: usize,
    /// Position recorded by `set_clean`; `None` once that state is unreachable.
    clean_index: Option<usize>,
    /// 0 keeps everything.
    max_depth: usize,
    open_macros: Vec<MacroCommand>,
    sink: Box<dyn ChangeSink>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_sink(NullSink)
    }

    pub fn with_sink(sink: impl ChangeSink + 'static) -> Self {
        UndoStack {
            commands: Vec::new(),
            index: 0,
            clean_index: Some(0),
            max_depth: DEFAULT_MAX_DEPTH,
            open_macros: Vec::new(),
            sink: Box::new(sink),
        }
    }

    pub fn set_sink(&mut self, sink: impl ChangeSink + 'static) {
        self.sink = Box::new(sink);
    }

    /// Forward an event that is not tied to a command (e.g. evaluation failures).
    pub fn notify(&mut self, event: ColumnEvent) {
        self.sink.notify(event);
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Limit the history; the oldest entries go first.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
        self.enforce_depth();
    }

    /// Apply `command` and record it.
    pub fn push(&mut self, mut command: Box<dyn UndoCommand>) {
        debug!(command = command.text(), "push");
        command.redo(self.sink.as_mut());
        self.record(command);
    }

    fn record(&mut self, command: Box<dyn UndoCommand>) {
        if let Some(open) = self.open_macros.last_mut() {
            open.push(command);
            return;
        }
        self.commands.truncate(self.index);
        if self.clean_index.is_some_and(|clean| clean > self.index) {
            self.clean_index = None;
        }
        self.commands.push(command);
        self.index += 1;
        self.enforce_depth();
    }

    fn enforce_depth(&mut self) {
        if self.max_depth == 0 || self.commands.len() <= self.max_depth {
            return;
        }
        let excess = self.commands.len() - self.max_depth;
        self.commands.drain(..excess);
        self.index = self.index.saturating_sub(excess);
        self.clean_index = self
            .clean_index
            .and_then(|clean| clean.checked_sub(excess));
    }

    pub fn undo(&mut self) -> Result<()> {
        if self.is_macro_open() {
            return Err(DatacolError::MacroOpen);
        }
        if self.index == 0 {
            return Err(DatacolError::NothingToUndo);
        }
        self.index -= 1;
        let command = &mut self.commands[self.index];
        debug!(command = command.text(), "undo");
        command.undo(self.sink.as_mut());
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        if self.is_macro_open() {
            return Err(DatacolError::MacroOpen);
        }
        let Some(command) = self.commands.get_mut(self.index) else {
            return Err(DatacolError::NothingToRedo);
        };
        debug!(command = command.text(), "redo");
        command.redo(self.sink.as_mut());
        self.index += 1;
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0 && !self.is_macro_open()
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.commands.len() && !self.is_macro_open()
    }

    /// Description of the command `undo` would revert.
    pub fn undo_text(&self) -> Option<&str> {
        self.index
            .checked_sub(1)
            .and_then(|i| self.commands.get(i))
            .map(|c| c.text())
    }

    /// Description of the command `redo` would apply.
    pub fn redo_text(&self) -> Option<&str> {
        self.commands.get(self.index).map(|c| c.text())
    }

    /// Start grouping pushed commands into one entry. Macros nest.
    pub fn begin_macro(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!(text = %text, "begin macro");
        self.open_macros.push(MacroCommand::new(text));
    }

    /// Close the innermost macro. An empty macro leaves no entry.
    pub fn end_macro(&mut self) -> Result<()> {
        let group = self.open_macros.pop().ok_or(DatacolError::NoOpenMacro)?;
        debug!(text = group.text(), commands = group.len(), "end macro");
        if !group.is_empty() {
            self.record(Box::new(group));
        }
        Ok(())
    }

    /// Run `f` inside a macro named `text`.
    pub fn with_macro<R>(&mut self, text: impl Into<String>, f: impl FnOnce(&mut UndoStack) -> R) -> R {
        let depth = self.open_macros.len();
        self.begin_macro(text);
        let result = f(self);
        // close anything `f` left open along with our own macro
        while self.open_macros.len() > depth {
            if self.end_macro().is_err() {
                break;
            }
        }
        result
    }

    pub fn is_macro_open(&self) -> bool {
        !self.open_macros.is_empty()
    }

    /// Record the current position as saved.
    pub fn set_clean(&mut self) {
        self.clean_index = Some(self.index);
    }

    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.index)
    }

    /// Number of entries (applied and undone).
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Forget all history. The current state becomes clean.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.open_macros.clear();
        self.index = 0;
        self.clean_index = Some(0);
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::numeric;
    use crate::commands::{ColumnRef, SetCellCommand};
    use crate::events::EventCollector;
    use datacol_engine::CellValue;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn set(column: &ColumnRef, row: usize, value: f64) -> Box<dyn UndoCommand> {
        Box::new(SetCellCommand::new(column.clone(), row, CellValue::Number(value)))
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let column = numeric(&[0.0]);
        let mut stack = UndoStack::new();
        stack.push(set(&column, 0, 1.0));
        stack.push(set(&column, 0, 2.0));
        assert_eq!(column.borrow().value_at(0), 2.0);

        stack.undo().unwrap();
        stack.undo().unwrap();
        assert_eq!(column.borrow().value_at(0), 0.0);
        assert!(matches!(stack.undo(), Err(DatacolError::NothingToUndo)));

        stack.redo().unwrap();
        assert_eq!(column.borrow().value_at(0), 1.0);
        assert_eq!(stack.redo_text(), Some("set cell 1 of column x"));
    }

    #[test]
    fn test_push_discards_redo_tail() {
        let column = numeric(&[0.0]);
        let mut stack = UndoStack::new();
        stack.push(set(&column, 0, 1.0));
        stack.push(set(&column, 0, 2.0));
        stack.undo().unwrap();
        stack.push(set(&column, 0, 3.0));
        assert_eq!(stack.len(), 2);
        assert!(!stack.can_redo());
        assert!(matches!(stack.redo(), Err(DatacolError::NothingToRedo)));
    }

    #[test]
    fn test_macro_groups_and_nests() {
        let column = numeric(&[0.0, 0.0]);
        let mut stack = UndoStack::new();
        stack.begin_macro("outer");
        stack.push(set(&column, 0, 1.0));
        stack.begin_macro("inner");
        stack.push(set(&column, 1, 2.0));
        assert!(matches!(stack.undo(), Err(DatacolError::MacroOpen)));
        stack.end_macro().unwrap();
        stack.end_macro().unwrap();
        assert!(matches!(stack.end_macro(), Err(DatacolError::NoOpenMacro)));

        assert_eq!(stack.len(), 1);
        assert_eq!(stack.undo_text(), Some("outer"));
        stack.undo().unwrap();
        assert_eq!(column.borrow().value_at(0), 0.0);
        assert_eq!(column.borrow().value_at(1), 0.0);
    }

    #[test]
    fn test_empty_macro_is_discarded() {
        let mut stack = UndoStack::new();
        stack.with_macro("nothing", |_| {});
        assert!(stack.is_empty());
    }

    #[test]
    fn test_max_depth_drops_oldest() {
        let column = numeric(&[0.0]);
        let mut stack = UndoStack::new();
        stack.set_max_depth(2);
        for v in 1..=4 {
            stack.push(set(&column, 0, f64::from(v)));
        }
        assert_eq!(stack.len(), 2);
        stack.undo().unwrap();
        stack.undo().unwrap();
        assert_eq!(column.borrow().value_at(0), 2.0);
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_clean_state() {
        let column = numeric(&[0.0]);
        let mut stack = UndoStack::new();
        assert!(stack.is_clean());
        stack.push(set(&column, 0, 1.0));
        assert!(!stack.is_clean());
        stack.set_clean();
        stack.undo().unwrap();
        assert!(!stack.is_clean());
        stack.redo().unwrap();
        assert!(stack.is_clean());

        stack.undo().unwrap();
        stack.push(set(&column, 0, 5.0));
        assert!(!stack.is_clean());
    }

    #[test]
    fn test_one_event_per_redo_and_undo() {
        let collector = Rc::new(RefCell::new(EventCollector::new()));
        let column = numeric(&[0.0]);
        let mut stack = UndoStack::with_sink(collector.clone());
        stack.push(set(&column, 0, 1.0));
        stack.undo().unwrap();
        stack.redo().unwrap();
        assert_eq!(collector.borrow().len(), 3);
    }
}
