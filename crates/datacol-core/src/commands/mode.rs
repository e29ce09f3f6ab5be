use datacol_engine::{ColumnMode, ModeData, OutputFilter};

use super::{ColumnRef, UndoCommand};
use crate::events::{ChangeSink, ColumnEvent};

/// Change a column's mode. The conversion runs once; afterwards redo and
/// undo swap the converted and original mode states wholesale.
pub struct SetModeCommand {
    column: ColumnRef,
    mode: ColumnMode,
    output_filter: OutputFilter,
    old: Option<ModeData>,
    new: Option<ModeData>,
    text: String,
}

impl SetModeCommand {
    pub fn new(column: ColumnRef, mode: ColumnMode, output_filter: OutputFilter) -> Self {
        let text = format!("change mode of column {}", column.name());
        SetModeCommand {
            column,
            mode,
            output_filter,
            old: None,
            new: None,
            text,
        }
    }
}

impl UndoCommand for SetModeCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        {
            let mut storage = self.column.borrow_mut();
            let old = match self.new.take() {
                Some(new) => storage.replace_mode_data(new),
                None => storage.set_mode(self.mode, self.output_filter.clone()),
            };
            self.old = Some(old);
        }
        sink.notify(ColumnEvent::ColumnReplaced {
            column: self.column.id(),
        });
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        if let Some(old) = self.old.take() {
            self.new = Some(self.column.borrow_mut().replace_mode_data(old));
        }
        sink.notify(ColumnEvent::ColumnReplaced {
            column: self.column.id(),
        });
    }
}
