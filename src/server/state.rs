//! Application state management

use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::service::PredictionService;

use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub service: Arc<PredictionService>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, service: PredictionService) -> Self {
        Self {
            config,
            service: Arc::new(service),
            started_at: chrono::Utc::now(),
        }
    }

    /// Load the model named by `config`; errors abort startup.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let service = PredictionService::load(
            &config.model_path,
            config.feature_params_path.as_deref(),
        )?;
        Ok(Self::new(config, service))
    }

    /// Short id used to correlate the log lines of one request
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }
}
