//! REST API type definitions

use labfeat_etl::EtlService;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EtlService>,

    /// Serializes ETL runs: overlapping trigger requests queue here instead
    /// of racing the sink's read-check-write sequence.
    pub run_lock: Arc<Mutex<()>>,
}
