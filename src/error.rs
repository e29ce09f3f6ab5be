//! Error types for the datacol command line

use thiserror::Error;

/// Errors in how the program was invoked
#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("Expected NAME=VALUE, got: {0}")]
    BadAssignment(String),

    #[error("No table file given")]
    MissingTable,
}

pub type Result<T> = std::result::Result<T, CliError>;
