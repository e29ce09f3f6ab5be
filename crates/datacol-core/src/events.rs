//! Change notifications for hosts (views, servers, tests).
//!
//! Every state-mutating command emits exactly one [`ColumnEvent`] per
//! `redo()` and per `undo()`. Events are keyed by [`ColumnId`], which stays
//! stable while the column's storage is swapped underneath it.

use std::cell::RefCell;
use std::rc::Rc;

use datacol_engine::Interval;

use crate::column::ColumnId;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnEvent {
    /// `count` rows were inserted starting at `first`.
    RowsInserted {
        column: ColumnId,
        first: usize,
        count: usize,
    },
    /// `count` rows starting at `first` were removed.
    RowsRemoved {
        column: ColumnId,
        first: usize,
        count: usize,
    },
    /// Cell data or row attributes changed. `rows: None` means the whole column.
    DataChanged {
        column: ColumnId,
        rows: Option<Interval>,
    },
    /// Mode, buffer and filters were swapped as a unit.
    ColumnReplaced { column: ColumnId },
    /// Name or comment changed.
    DescriptionChanged { column: ColumnId },
    PlotDesignationChanged { column: ColumnId },
    /// The evaluator could not produce a value; the cell was left alone.
    EvaluationFailed {
        column: ColumnId,
        row: usize,
        message: String,
    },
}

impl ColumnEvent {
    pub fn column(&self) -> ColumnId {
        match self {
            ColumnEvent::RowsInserted { column, .. }
            | ColumnEvent::RowsRemoved { column, .. }
            | ColumnEvent::DataChanged { column, .. }
            | ColumnEvent::ColumnReplaced { column }
            | ColumnEvent::DescriptionChanged { column }
            | ColumnEvent::PlotDesignationChanged { column }
            | ColumnEvent::EvaluationFailed { column, .. } => *column,
        }
    }
}

/// Receiver of change notifications.
pub trait ChangeSink {
    fn notify(&mut self, event: ColumnEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn notify(&mut self, _event: ColumnEvent) {}
}

/// Forwards events to a closure.
pub struct CallbackSink(pub Box<dyn FnMut(ColumnEvent)>);

impl CallbackSink {
    pub fn new(callback: impl FnMut(ColumnEvent) + 'static) -> Self {
        CallbackSink(Box::new(callback))
    }
}

impl ChangeSink for CallbackSink {
    fn notify(&mut self, event: ColumnEvent) {
        (self.0)(event)
    }
}

/// Shared sink, so a host can keep a handle to what the stack writes into.
impl<S: ChangeSink + ?Sized> ChangeSink for Rc<RefCell<S>> {
    fn notify(&mut self, event: ColumnEvent) {
        self.borrow_mut().notify(event)
    }
}

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<ColumnEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn events(&self) -> &[ColumnEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Only EvaluationFailed events.
    pub fn failures(&self) -> Vec<&ColumnEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, ColumnEvent::EvaluationFailed { .. }))
            .collect()
    }
}

impl ChangeSink for EventCollector {
    fn notify(&mut self, event: ColumnEvent) {
        self.events.push(event);
    }
}
