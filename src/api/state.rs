use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    config::Config,
    data::artifacts,
    error::{AppError, AppResult},
    services::ModelContext,
};

/// Shared application state
///
/// Models are loaded once and never mutated, so handlers share them without locks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    models: Option<Arc<ModelContext>>,
    loaded_at: Option<DateTime<Utc>>,
}

impl AppState {
    /// Creates state around an already built model context
    pub fn new(config: Config, models: Option<ModelContext>) -> Self {
        let loaded_at = models.as_ref().map(|_| Utc::now());
        Self {
            config: Arc::new(config),
            models: models.map(Arc::new),
            loaded_at,
        }
    }

    /// Loads the models from `config.models_dir`
    ///
    /// Missing or unreadable artifacts are logged and leave the state without
    /// models; recommendation routes then answer 503 until the service is
    /// restarted with trained models.
    pub fn load(config: Config) -> Self {
        let models = match artifacts::load_models(&config.models_dir, config.fuzzy_threshold) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    models_dir = %config.models_dir,
                    "Models unavailable, run the train binary first"
                );
                None
            }
        };
        Self::new(config, models)
    }

    /// Loaded models, or `ModelsNotFound` when startup loading failed
    pub fn models(&self) -> AppResult<&ModelContext> {
        self.models.as_deref().ok_or_else(|| {
            AppError::ModelsNotFound(format!("no models loaded from {}", self.config.models_dir))
        })
    }

    pub fn is_ready(&self) -> bool {
        self.models.is_some()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}
