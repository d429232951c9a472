//! API route definitions

use std::sync::Arc;
use std::time::Duration;
use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    BoxError, Json, Router,
};
use serde_json::json;
use tower::{timeout::{error::Elapsed, TimeoutLayer}, ServiceBuilder};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::{handlers, state::AppState, ServerConfig, ServerError};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found. Upload files to POST /predict/.",
        })),
    )
}

async fn handle_405() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": "Method not allowed.",
        })),
    )
}

/// Errors raised by the middleware stack, rendered like handler errors.
async fn handle_middleware_error(timeout_secs: u64, err: BoxError) -> ServerError {
    if err.is::<Elapsed>() {
        ServerError::Timeout(timeout_secs)
    } else {
        ServerError::Internal(format!("unhandled middleware error: {}", err))
    }
}

/// Every origin, method and header is mirrored back so credentials stay allowed.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = match config.cors_origin.as_deref().map(str::parse::<HeaderValue>) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(e)) => {
            warn!(error = %e, "Ignoring invalid CORS_ORIGIN, mirroring request origin");
            AllowOrigin::mirror_request()
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let timeout_secs = config.request_timeout_secs;

    Router::new()
        .route("/predict/", post(handlers::predict))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health_check))
        .route("/model", get(handlers::model_info))
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_size))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| {
                    handle_middleware_error(timeout_secs, err)
                }))
                .layer(TimeoutLayer::new(Duration::from_secs(timeout_secs))),
        )
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}
