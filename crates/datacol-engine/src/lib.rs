//! datacol-engine - typed column storage and formula evaluation.
//!
//! - [`Interval`], [`IntervalAttribute`] - row-interval attribute stores
//!   (validity, masking, formulas)
//! - [`ColumnMode`], [`DataType`], [`PlotDesignation`] - column typing
//! - [`ColumnData`], [`CellValue`] - the typed buffers
//! - [`InputFilter`], [`OutputFilter`] - text <-> value conversion
//! - [`ColumnStorage`] - one column's buffer plus its attributes
//! - [`FormulaEvaluator`], [`RhaiEvaluator`] - formula evaluation
//!
//! Nothing here records history. Storage is plain owned data and is not
//! meant to be shared across threads while it is being edited.

pub mod attribute;
pub mod data;
pub mod eval;
pub mod filter;
pub mod interval;
pub mod mode;
pub mod storage;

pub use attribute::IntervalAttribute;
pub use data::{CellValue, ColumnData};
pub use eval::{
    ColumnValues, EvalError, FormulaEvaluator, FormulaValue, RhaiEvaluator, column_to_dynamic,
    create_engine,
};
pub use filter::{InputFilter, NumericFormat, OutputFilter};
pub use interval::Interval;
pub use mode::{ColumnMode, DataType, PlotDesignation};
pub use storage::{ColumnStorage, DataAndValidity, ModeData};

pub use rhai::Dynamic;
