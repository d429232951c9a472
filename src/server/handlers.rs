//! HTTP request handlers

use std::sync::Arc;
use std::time::Instant;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::export::XLSX_CONTENT_TYPE;
use crate::utils::FileFormat;

use super::error::{Result, ServerError};
use super::state::AppState;

const ATTACHMENT: &str = "attachment; filename=predictions.xlsx";

// ============================================================================
// Prediction Handler
// ============================================================================

/// Score an uploaded CSV or Excel file and return the annotated workbook.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let mut multipart = multipart.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let request_id = AppState::generate_id();
    let start = Instant::now();

    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        // Reject by extension before buffering the body.
        let format = FileFormat::from_filename(&file_name)?;
        let data = field.bytes().await?;
        info!(
            request_id = %request_id,
            file_name = %file_name,
            format = %format,
            bytes = data.len(),
            "Received upload"
        );

        let service = Arc::clone(&state.service);
        let name = file_name.clone();
        let output = tokio::task::spawn_blocking(move || service.run(&data, &name))
            .await
            .map_err(|e| ServerError::Internal(format!("prediction task failed: {}", e)))??;

        info!(
            request_id = %request_id,
            file_name = %file_name,
            rows = output.rows,
            positives = output.positives,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prediction complete"
        );

        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
                (header::CONTENT_DISPOSITION, HeaderValue::from_static(ATTACHMENT)),
            ],
            output.workbook,
        )
            .into_response());
    }

    Err(ServerError::BadRequest("No file uploaded".to_string()))
}

// ============================================================================
// System Handlers
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime.num_seconds(),
    }))
}

/// Metadata of the loaded classifier
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let model = state.service.model();
    Json(serde_json::json!({
        "objective": model.objective().as_str(),
        "n_trees": model.n_trees(),
        "n_features": model.n_features(),
        "base_score": model.base_score(),
        "feature_names": model.feature_names(),
        "xgboost_version": model.version(),
        "frozen_feature_params": state.service.is_frozen(),
        "model_path": state.config.model_path.display().to_string(),
    }))
}
