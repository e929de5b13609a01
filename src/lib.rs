//! Portfolio Builder - library for app logic and testing

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod password;
pub mod routes;
pub mod social;
pub mod state;
pub mod validation;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::logging::LogConfig;
use crate::state::AppState;

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, falling back
/// to the local dev frontend.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(routes::auth::login))
        .route(
            "/users",
            get(routes::users::list_users).post(routes::users::signup),
        )
        .route(
            "/templates",
            get(routes::templates::list_templates).post(routes::templates::create_template),
        )
        .route("/templates/{id}", get(routes::templates::get_template))
        .route(
            "/portfolios",
            get(routes::portfolio::list_portfolios)
                .post(routes::portfolio::save_portfolio)
                .put(routes::portfolio::patch_portfolio),
        )
        .route(
            "/portfolios/publish",
            get(routes::publish::get_published).post(routes::publish::publish_portfolio),
        )
        .route(
            "/social/{platform}",
            get(routes::social::get_account)
                .post(routes::social::connect_account)
                .put(routes::social::get_analytics),
        )
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    let request_timeout = state.config.request_timeout;

    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        // Global 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
}

/// Connect and migrate, or run without a database if that fails.
async fn connect_database() -> Option<sqlx::PgPool> {
    if std::env::var("DATABASE_URL").is_err() {
        tracing::info!("DATABASE_URL not set. Running without database connection.");
        return None;
    }

    let pool = match db::init_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Continuing without database.",
                e
            );
            return None;
        }
    };

    if let Err(e) = db::run_migrations(&pool).await {
        tracing::error!("Failed to run database migrations: {}", e);
    }

    Some(pool)
}

/// Run the server (used by main).
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let _log_guards = logging::init(&LogConfig::default());

    routes::health::init_start_time();

    let config = AppConfig::default();
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        environment = %config.environment,
        root_domain = %config.root_domain,
        "Configuration loaded"
    );

    let db = connect_database().await;
    let app = create_app(AppState::new(db, config));

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
