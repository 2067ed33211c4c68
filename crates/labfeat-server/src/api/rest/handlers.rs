//! API endpoint handlers

use super::conversions::table_to_records;
use super::types::AppState;
use super::views::{error_page, index_page, success_page};
use crate::error::ServerError;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use labfeat_etl::EtlOutcome;
use tracing::info;

/// Index endpoint: static page listing the available endpoints
pub(super) async fn index() -> Html<&'static str> {
    Html(index_page())
}

/// Trigger endpoint: runs the full ETL chain and renders the outcome.
///
/// All failures arrive as a tagged outcome; this handler itself never
/// errors.
pub(super) async fn trigger_etl(State(state): State<AppState>) -> Response {
    info!("Received ETL trigger request");

    // One run at a time; concurrent triggers queue here.
    let _guard = state.run_lock.lock().await;

    match state.service.run().await {
        EtlOutcome::Success { message, .. } => {
            (StatusCode::OK, Html(success_page(200, &message))).into_response()
        }
        EtlOutcome::Error { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(error_page(500, &message)),
        )
            .into_response(),
    }
}

/// Results endpoint: the persisted feature table as a JSON array of row
/// objects
pub(super) async fn etl_results(State(state): State<AppState>) -> Result<Response, ServerError> {
    info!("Received ETL results request");

    let table = state.service.results().await?;
    let records = table_to_records(&table);
    let body = serde_json::to_string(&records)
        .map_err(|e| ServerError::InternalError(format!("Failed to serialize results: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    )
        .into_response())
}
