//! Server configuration

use labfeat_etl::DatabaseConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory holding the three source extracts
    /// (users.csv, compounds.csv, user_experiments.csv)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Storage connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Target schema for the feature table
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Target feature table name
    #[serde(default = "default_table")]
    pub table: String,

    /// Log level
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_schema() -> String {
    "sandbox".to_string()
}

fn default_table() -> String {
    "features".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: default_data_dir(),
            database: DatabaseConfig::default(),
            schema: default_schema(),
            table: default_table(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if exists
        dotenvy::dotenv().ok();

        // Try to read from config file
        let config_result = config::Config::builder()
            .add_source(config::File::with_name("config/server").required(false))
            .add_source(config::Environment::with_prefix("LABFEAT").separator("__"))
            .build();

        match config_result {
            Ok(cfg) => cfg
                .try_deserialize()
                .map_err(|e| anyhow::anyhow!("Failed to deserialize config: {}", e)),
            Err(_) => {
                // Use default config if no config file found
                tracing::info!("No config file found, using default configuration");
                Ok(Self::default())
            }
        }
    }
}
