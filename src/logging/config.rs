use std::path::PathBuf;

/// Logging settings read from `ENVIRONMENT`, `LOG_LEVEL` and `LOG_DIR`.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub environment: String,
    pub level: String,
    pub dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if environment == "production" {
                "info".to_string()
            } else {
                "debug".to_string()
            }
        });

        Self {
            level,
            dir: std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs")),
            environment,
        }
    }
}

impl LogConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        format!(
            "portfolio_builder={},tower_http=debug,axum=debug,sqlx=warn",
            self.level
        )
    }
}
