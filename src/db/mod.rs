pub mod models;
pub mod portfolios;
pub mod publish;
pub mod social;
pub mod templates;
pub mod users;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub statement_timeout_ms: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/portfolio_builder".to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            statement_timeout_ms: std::env::var("DB_STATEMENT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
        }
    }
}

/// Connection URL with everything but the structural characters masked.
fn redacted_url(url: &str) -> String {
    url.replace(
        |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
        "*",
    )
}

pub async fn init_pool(config: Option<DbConfig>) -> Result<PgPool, sqlx::Error> {
    let config = config.unwrap_or_default();

    tracing::info!("Initializing database connection pool...");
    tracing::debug!("Database URL: {}", redacted_url(&config.url));

    // Every pooled session gets a server-side statement timeout.
    let options = PgConnectOptions::from_str(&config.url)?.options([(
        "statement_timeout",
        format!("{}ms", config.statement_timeout_ms),
    )]);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect_with(options)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(pool)
}

pub async fn health_check(pool: Option<&PgPool>) -> Result<std::time::Duration, sqlx::Error> {
    let pool =
        pool.ok_or_else(|| sqlx::Error::Configuration("Database pool not initialized".into()))?;

    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool).await?;

    Ok(start.elapsed())
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT NOT NULL,
            username TEXT NOT NULL,
            full_name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            plan TEXT NOT NULL DEFAULT 'free'
                CHECK (plan IN ('free', 'pro', 'premium')),
            profile_image TEXT,
            bio TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT users_email_key UNIQUE (email),
            CONSTRAINT users_username_key UNIQUE (username)
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS templates (
            id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::TEXT,
            name TEXT NOT NULL,
            description TEXT,
            category TEXT,
            preview_image TEXT,
            template_data JSONB NOT NULL DEFAULT '{}'::jsonb,
            is_premium BOOLEAN NOT NULL DEFAULT false,
            is_active BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS portfolios (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL DEFAULT 'My Portfolio',
            subtitle TEXT,
            template_id TEXT NOT NULL DEFAULT 'minimal',
            theme_settings JSONB NOT NULL DEFAULT '{}'::jsonb,
            is_published BOOLEAN NOT NULL DEFAULT false,
            subdomain TEXT NOT NULL,
            meta_title TEXT,
            meta_description TEXT,
            custom_css TEXT,
            favicon_url TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT portfolios_user_id_key UNIQUE (user_id),
            CONSTRAINT portfolios_subdomain_key UNIQUE (subdomain)
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS portfolio_sections (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            portfolio_id UUID NOT NULL REFERENCES portfolios(id) ON DELETE CASCADE,
            section_type TEXT NOT NULL,
            title TEXT,
            content TEXT NOT NULL DEFAULT '',
            media_urls JSONB NOT NULL DEFAULT '[]'::jsonb,
            settings JSONB NOT NULL DEFAULT '{}'::jsonb,
            sort_order INTEGER NOT NULL DEFAULT 0,
            is_visible BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_portfolio_sections_portfolio_order
            ON portfolio_sections(portfolio_id, sort_order)
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS social_accounts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            platform TEXT NOT NULL,
            username TEXT NOT NULL,
            access_token TEXT,
            followers_count BIGINT NOT NULL DEFAULT 0,
            posts_count BIGINT NOT NULL DEFAULT 0,
            engagement_rate DOUBLE PRECISION NOT NULL DEFAULT 0,
            last_synced_at TIMESTAMPTZ,
            is_active BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT social_accounts_user_platform_key UNIQUE (user_id, platform)
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS social_analytics (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            social_account_id UUID NOT NULL REFERENCES social_accounts(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            followers_count BIGINT NOT NULL DEFAULT 0,
            posts_count BIGINT NOT NULL DEFAULT 0,
            likes_count BIGINT NOT NULL DEFAULT 0,
            comments_count BIGINT NOT NULL DEFAULT 0,
            engagement_rate DOUBLE PRECISION NOT NULL DEFAULT 0,
            reach BIGINT NOT NULL DEFAULT 0,
            impressions BIGINT NOT NULL DEFAULT 0,
            CONSTRAINT social_analytics_account_date_key UNIQUE (social_account_id, date)
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS portfolio_analytics (
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            portfolio_views BIGINT NOT NULL DEFAULT 0,
            unique_visitors BIGINT NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, date)
        )
    "#,
    )
    .execute(pool)
    .await?;

    // One statement per query: prepared statements reject multi-command strings.
    for index in [
        "CREATE INDEX IF NOT EXISTS idx_templates_active_category ON templates(is_active, category)",
        "CREATE INDEX IF NOT EXISTS idx_portfolios_published ON portfolios(is_published)",
        "CREATE INDEX IF NOT EXISTS idx_users_plan_created ON users(plan, created_at DESC)",
    ] {
        sqlx::query(index).execute(pool).await?;
    }

    tracing::info!("Database migrations completed successfully");

    Ok(())
}
