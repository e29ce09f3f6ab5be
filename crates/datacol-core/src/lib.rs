//! datacol-core - undoable column model.
//!
//! Columns are edited through commands recorded on a linear [`UndoStack`].
//! The model is single-threaded: columns share storage through `Rc`, so none
//! of these types are `Send`. Hosts that edit from several threads must
//! serialize access themselves.

pub mod column;
pub mod commands;
pub mod error;
pub mod events;
pub mod history;
pub mod settings;
pub mod snapshot;
pub mod table;

pub use column::{Column, ColumnId};
pub use commands::{MacroCommand, UndoCommand};
pub use error::{DatacolError, Result};
pub use events::{CallbackSink, ChangeSink, ColumnEvent, EventCollector, NullSink};
pub use history::UndoStack;
pub use settings::Settings;
pub use snapshot::{ColumnSnapshot, TableSnapshot};
pub use table::{RecalcSummary, Selection, Table, build_evaluator};

pub use datacol_engine::{
    CellValue, ColumnMode, FormulaEvaluator, Interval, PlotDesignation, RhaiEvaluator,
};
