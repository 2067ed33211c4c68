//! labfeat ETL - Extract, transform, load engine for lab feature data
//!
//! This crate provides the full ETL chain:
//! - `ingest`: tab-delimited extract loading with delimiter scrubbing
//! - `derive`: the feature derivation pipeline (the computation core)
//! - `sink`: Postgres persistence with replace-on-change semantics
//! - `service`: the high-level facade that runs the chain end to end

pub mod derive;
pub mod error;
pub mod ingest;
pub mod service;
pub mod sink;

// Re-export main types
pub use error::{EtlError, Result};
pub use service::{DatabaseConfig, EtlOutcome, EtlService};
pub use sink::{FeatureSink, WriteOutcome};
