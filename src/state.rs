/**
 * Application State
 * Shared handles passed to every handler
 */
use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::social::{SimulatedProvider, SocialProvider};

#[derive(Clone)]
pub struct AppState {
    /// `None` when the server runs without a database.
    pub db: Option<PgPool>,
    pub config: Arc<AppConfig>,
    pub social: Arc<dyn SocialProvider>,
}

impl AppState {
    pub fn new(db: Option<PgPool>, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            social: Arc::new(SimulatedProvider),
        }
    }

    pub fn with_social_provider(mut self, provider: Arc<dyn SocialProvider>) -> Self {
        self.social = provider;
        self
    }

    pub fn pool(&self) -> AppResult<&PgPool> {
        self.db.as_ref().ok_or(AppError::ServiceUnavailable)
    }
}
