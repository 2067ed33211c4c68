//! High-level ETL facade
//!
//! `EtlService` runs the whole chain (load the three extracts, derive the
//! feature table, persist it) and converts every failure into a tagged
//! outcome. Nothing raises past `run()`; the HTTP layer renders the outcome
//! as-is.

use crate::derive;
use crate::error::Result;
use crate::ingest;
use crate::sink::{FeatureSink, WriteOutcome};
use labfeat_core::Table;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

/// Storage connection settings.
///
/// Explicit configuration, loaded once at startup and passed by reference,
/// never embedded literals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "labdb".to_string(),
            user: "labuser".to_string(),
            password: "labuser".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Postgres connection URL for this configuration
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// Tagged result of an ETL run; the error message is surfaced verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EtlOutcome {
    Success { message: String, rows: usize },
    Error { message: String },
}

/// ETL service facade
pub struct EtlService {
    data_dir: PathBuf,
    database: DatabaseConfig,
    schema: String,
    table: String,
}

impl EtlService {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        database: DatabaseConfig,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            database,
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Run the full ETL chain.
    ///
    /// Every failure is captured and converted into `EtlOutcome::Error`;
    /// this method does not return `Err`.
    pub async fn run(&self) -> EtlOutcome {
        info!("Starting ETL run from {}", self.data_dir.display());
        match self.run_inner().await {
            Ok(rows) => {
                info!("ETL run completed for {} rows", rows);
                EtlOutcome::Success {
                    message: format!("ETL process completed for {} rows", rows),
                    rows,
                }
            }
            Err(e) => {
                error!("ETL run failed: {}", e);
                EtlOutcome::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn run_inner(&self) -> Result<usize> {
        let users = ingest::load_table(&self.data_dir.join("users.csv"))?;
        let compounds = ingest::load_table(&self.data_dir.join("compounds.csv"))?;
        let experiments = ingest::load_table(&self.data_dir.join("user_experiments.csv"))?;

        let features = derive::derive_features(&users, &compounds, &experiments)?;
        let rows = features.n_rows();

        let sink = FeatureSink::connect(&self.database.url(), &self.schema, &self.table).await?;
        sink.ensure_schema().await?;
        sink.ensure_table(&features).await?;
        match sink.write(&features).await? {
            WriteOutcome::Unchanged => info!("Feature table unchanged"),
            WriteOutcome::Replaced { rows } => info!("Feature table replaced ({} rows)", rows),
        }

        Ok(rows)
    }

    /// Read the persisted feature table back.
    pub async fn results(&self) -> Result<Table> {
        let sink = FeatureSink::connect(&self.database.url(), &self.schema, &self.table).await?;
        sink.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;

    #[test]
    fn test_database_config_url() {
        let config = DatabaseConfig {
            host: "db".to_string(),
            port: 5433,
            database: "labdb".to_string(),
            user: "labuser".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(config.url(), "postgres://labuser:secret@db:5433/labdb");
    }

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.port, 5432);
        assert!(config.url().starts_with("postgres://"));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = EtlOutcome::Success {
            message: "ETL process completed for 3 rows".to_string(),
            rows: 3,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["rows"], 3);

        let outcome = EtlOutcome::Error {
            message: "Ingest error: boom".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Ingest error: boom");
    }

    #[tokio::test]
    async fn test_run_with_missing_sources_is_tagged_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = EtlService::new(
            dir.path(),
            DatabaseConfig::default(),
            "sandbox",
            "features",
        );

        // missing users.csv fails long before any connection is attempted
        match service.run().await {
            EtlOutcome::Error { message } => {
                assert!(message.contains("Ingest error"));
                assert!(message.contains("users.csv"));
            }
            other => panic!("Expected Error outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_with_bad_derivation_is_tagged_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("users.csv"),
            "user_id\tsignup_date\nnot-a-number\t2020-01-01\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("compounds.csv"), "compound_id\tname\n7\tx\n").unwrap();
        std::fs::write(
            dir.path().join("user_experiments.csv"),
            "user_id\texperiment_run_time\texperiment_compound_ids\nnot-a-number\t10\t7\n",
        )
        .unwrap();

        let service = EtlService::new(
            dir.path(),
            DatabaseConfig::default(),
            "sandbox",
            "features",
        );
        match service.run().await {
            EtlOutcome::Error { message } => {
                assert!(message.contains("Derivation error"));
            }
            other => panic!("Expected Error outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_read_error_category_exists() {
        // the results path surfaces store failures as Read errors
        let err = EtlError::Read("relation missing".to_string());
        assert_eq!(err.to_string(), "Read error: relation missing");
    }
}
