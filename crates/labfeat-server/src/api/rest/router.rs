//! Router creation and configuration

use super::handlers::{etl_results, index, trigger_etl};
use super::types::AppState;
use axum::{routing::get, Router};
use labfeat_etl::EtlService;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create REST API router
pub fn create_router(service: Arc<EtlService>) -> Router {
    let state = AppState {
        service,
        run_lock: Arc::new(Mutex::new(())),
    };

    Router::new()
        .route("/", get(index))
        .route("/trigger-etl", get(trigger_etl).post(trigger_etl))
        .route("/etl-results", get(etl_results))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
