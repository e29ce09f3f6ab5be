//! Formula evaluation.
//!
//! Recalculation only needs something that turns a formula string and a
//! `(row, column)` context into a value, so the seam is the
//! [`FormulaEvaluator`] trait. [`RhaiEvaluator`] is the scripting-backed
//! implementation:
//!
//! - `i` / `j` hold the 1-based row and column of the cell being computed.
//! - `col("name", row)` reads another column (1-based row) from the shared
//!   [`ColumnValues`] cache; invalid or missing cells read as `()`.
//! - Optional user functions are prepended to every formula.
//!
//! Compiled formulas are cached, so a formula covering many rows is compiled
//! once per evaluator.

use dashmap::DashMap;
use rhai::{AST, Dynamic, Engine, Scope};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::data::CellValue;
use crate::storage::ColumnStorage;

/// Column name -> cell values, shared with the `col()` builtin.
/// DashMap is internally Arc-based; clones of the handle are cheap.
pub type ColumnValues = Arc<DashMap<String, Vec<Dynamic>>>;

/// Result of evaluating a formula for one cell.
#[derive(Clone, Debug, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
}

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Formula compile error: {0}")]
    Compile(String),

    #[error("Formula evaluation error: {0}")]
    Runtime(String),

    #[error("Formula did not produce a value")]
    NoValue,
}

/// Turns a formula plus its cell context into a value.
pub trait FormulaEvaluator {
    /// `row` and `column` are 0-indexed.
    fn evaluate(&mut self, formula: &str, row: usize, column: usize) -> Result<FormulaValue, EvalError>;

    /// Called before a recalculation pass with the current values of every
    /// column, in table order. The default ignores them.
    fn publish_column(&mut self, _name: &str, _values: Vec<Dynamic>) {}
}

/// Rhai-backed formula evaluator.
pub struct RhaiEvaluator {
    engine: Engine,
    values: ColumnValues,
    custom_script: Option<String>,
    compiled: HashMap<String, AST>,
}

impl RhaiEvaluator {
    pub fn new() -> Self {
        Self::with_values(ColumnValues::default())
    }

    /// Evaluator reading `col()` lookups from an existing cache.
    pub fn with_values(values: ColumnValues) -> Self {
        let engine = create_engine(values.clone());
        RhaiEvaluator {
            engine,
            values,
            custom_script: None,
            compiled: HashMap::new(),
        }
    }

    /// Evaluator with user-defined functions available to every formula.
    pub fn with_functions(script: &str) -> Result<Self, EvalError> {
        let mut evaluator = Self::new();
        evaluator.set_functions(Some(script.to_string()))?;
        Ok(evaluator)
    }

    /// Replace the user-defined functions. Fails without changing anything
    /// when the script does not compile.
    pub fn set_functions(&mut self, script: Option<String>) -> Result<(), EvalError> {
        if let Some(script) = &script {
            self.engine
                .compile(script)
                .map_err(|e| EvalError::Compile(format!("Error in custom functions: {}", e)))?;
        }
        self.custom_script = script;
        self.compiled.clear();
        Ok(())
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    fn ensure_compiled(&mut self, formula: &str) -> Result<(), EvalError> {
        if !self.compiled.contains_key(formula) {
            // Concatenate so closures in the custom script see registered functions.
            let source = match &self.custom_script {
                Some(script) => format!("{}\n{}", script, formula),
                None => formula.to_string(),
            };
            let ast = self
                .engine
                .compile(&source)
                .map_err(|e| EvalError::Compile(e.to_string()))?;
            self.compiled.insert(formula.to_string(), ast);
        }
        Ok(())
    }
}

impl Default for RhaiEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaEvaluator for RhaiEvaluator {
    fn evaluate(&mut self, formula: &str, row: usize, column: usize) -> Result<FormulaValue, EvalError> {
        self.ensure_compiled(formula)?;
        let Some(ast) = self.compiled.get(formula) else {
            return Err(EvalError::Compile(formula.to_string()));
        };
        let mut scope = Scope::new();
        scope.push("i", row as i64 + 1);
        scope.push("j", column as i64 + 1);
        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, ast)
            .map_err(|e| EvalError::Runtime(e.to_string()))?;
        dynamic_to_value(result)
    }

    fn publish_column(&mut self, name: &str, values: Vec<Dynamic>) {
        self.values.insert(name.to_string(), values);
    }
}

/// Create a Rhai engine with the column builtins registered.
pub fn create_engine(values: ColumnValues) -> Engine {
    let mut engine = Engine::new();
    engine.register_fn("col", move |name: &str, row: i64| -> Dynamic {
        if row < 1 {
            return Dynamic::UNIT;
        }
        values
            .get(name)
            .and_then(|cells| cells.get(row as usize - 1).cloned())
            .unwrap_or(Dynamic::UNIT)
    });
    engine
}

fn dynamic_to_value(value: Dynamic) -> Result<FormulaValue, EvalError> {
    if value.is_unit() {
        Err(EvalError::NoValue)
    } else if let Ok(n) = value.as_float() {
        Ok(FormulaValue::Number(n))
    } else if let Ok(n) = value.as_int() {
        Ok(FormulaValue::Number(n as f64))
    } else if let Ok(b) = value.as_bool() {
        Ok(FormulaValue::Text(b.to_string()))
    } else if value.is_string() {
        Ok(FormulaValue::Text(value.into_string().unwrap_or_default()))
    } else {
        Ok(FormulaValue::Text(value.to_string()))
    }
}

/// Cell values of a column as seen by formulas: numbers stay numbers,
/// other cells are rendered through the column's output filter, and invalid
/// cells are `()`.
pub fn column_to_dynamic(storage: &ColumnStorage) -> Vec<Dynamic> {
    (0..storage.row_count())
        .map(|row| {
            if storage.is_invalid(row) {
                return Dynamic::UNIT;
            }
            match storage.cell(row) {
                CellValue::Number(v) => Dynamic::from_float(v),
                CellValue::Text(s) => Dynamic::from(s),
                CellValue::DateTime(Some(_)) => Dynamic::from(storage.display_text(row)),
                CellValue::DateTime(None) => Dynamic::UNIT,
            }
        })
        .collect()
}
