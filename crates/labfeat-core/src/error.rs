//! Error types for labfeat Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Row arity mismatch: expected {expected} cells, got {got}")]
    RowArity { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
