//! ETL error types

use labfeat_core::CoreError;
use thiserror::Error;

/// ETL error
///
/// One variant per failure category; every variant carries the origin
/// message so the facade can surface it verbatim.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Source file missing, unreadable, or not parseable as delimited text
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Missing expected column, or a value not coercible to its declared type
    #[error("Derivation error: {0}")]
    Derivation(String),

    /// Storage connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema or table DDL failed at the store
    #[error("Schema error: {0}")]
    Schema(String),

    /// Write statement failed at the store
    #[error("Write error: {0}")]
    Write(String),

    /// Read-back of the persisted table failed at the store
    #[error("Read error: {0}")]
    Read(String),
}

impl From<CoreError> for EtlError {
    fn from(err: CoreError) -> Self {
        EtlError::Derivation(err.to_string())
    }
}

/// Result type for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;
