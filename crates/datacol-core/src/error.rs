//! Error types for Datacol core.

use thiserror::Error;

use datacol_engine::EvalError;

/// Errors that can occur while editing or persisting columns.
///
/// Individual commands never fail; these come from stack misuse, lookups and
/// I/O around the model.
#[derive(Error, Debug)]
pub enum DatacolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("No macro is open")]
    NoOpenMacro,

    #[error("Cannot undo or redo while a macro is open")]
    MacroOpen,

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("Rhai compile error: {0}")]
    RhaiCompile(String),
}

pub type Result<T> = std::result::Result<T, DatacolError>;
