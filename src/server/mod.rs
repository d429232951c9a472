//! Prediction server module
//!
//! HTTP front end for the admission risk classifier: a single multipart
//! upload endpoint returning the scored spreadsheet, plus health and model
//! metadata routes.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    /// Frozen encoder/scaler parameters; per-batch fitting when unset
    pub feature_params_path: Option<PathBuf>,
    pub max_upload_size: usize,
    pub request_timeout_secs: u64,
    /// Explicit allowed origin; every origin is mirrored when unset
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models/xgb_model.json")),
            feature_params_path: std::env::var("FEATURE_PARAMS_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100 * 1024 * 1024), // 100MB
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
            cors_origin: std::env::var("CORS_ORIGIN")
                .ok()
                .filter(|o| !o.is_empty() && o != "*"),
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    // Fail fast: no model, no server.
    let state = Arc::new(AppState::from_config(config.clone())?);
    if state.service.is_frozen() {
        info!("Feature parameters are frozen");
    } else {
        warn!("Encoder and scaler are fitted per request; codes depend on each batch");
    }

    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        max_upload_size_mb = config.max_upload_size / 1024 / 1024,
        request_timeout_secs = config.request_timeout_secs,
        started_at = %start_time.to_rfc3339(),
        "Admission risk server starting"
    );
    info!(url = %format!("http://{}/predict/", addr), "Prediction endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install ctrl+c handler");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
