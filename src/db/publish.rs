//! Publishing and the public read path with per-day view counting.

use chrono::NaiveDate;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{
    NewPortfolioSection, PortfolioSection, PortfolioViews, PortfolioWithOwner, SocialAccount,
};
use super::portfolios::{replace_sections, PortfolioData, DEFAULT_SUBTITLE, DEFAULT_TITLE};
use super::social::active_accounts;
use super::users::username_of;
use crate::error::{AppError, AppResult};

const DEFAULT_PUBLISHED_DESCRIPTION: &str = "Content Creator Portfolio";

/// How the public read path identifies a portfolio
#[derive(Debug, Clone)]
pub enum PublishedKey {
    Subdomain(String),
    Id(Uuid),
}

#[derive(Debug, Clone)]
pub struct PublishedPortfolio {
    pub id: Uuid,
    /// Bare slug; always the owner's username.
    pub subdomain: String,
}

/// Everything the public page needs, plus the counters after this view.
#[derive(Debug, Clone)]
pub struct PublishedView {
    pub portfolio: PortfolioWithOwner,
    pub sections: Vec<PortfolioSection>,
    pub social_accounts: Vec<SocialAccount>,
    pub views: PortfolioViews,
}

/// Publish the user's portfolio under their username.
///
/// Full overwrite of the builder-managed fields, full replacement of the
/// sections, and today's analytics row created if missing; one transaction.
pub async fn publish(
    pool: &PgPool,
    user_id: Uuid,
    data: &PortfolioData,
    raw: &Value,
    sections: &[NewPortfolioSection],
    today: NaiveDate,
) -> AppResult<PublishedPortfolio> {
    let mut tx = pool.begin().await?;

    let username = username_of(&mut *tx, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let title = data
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE);
    let subtitle = data
        .subtitle
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUBTITLE);
    let description = data
        .bio
        .as_deref()
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_PUBLISHED_DESCRIPTION);

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO portfolios (
            user_id, title, subtitle, theme_settings, is_published,
            subdomain, meta_title, meta_description
        )
        VALUES ($1, $2, $3, $4, true, $5, $2, $6)
        ON CONFLICT (user_id) DO UPDATE SET
            title = EXCLUDED.title,
            subtitle = EXCLUDED.subtitle,
            theme_settings = EXCLUDED.theme_settings,
            is_published = true,
            subdomain = EXCLUDED.subdomain,
            meta_title = EXCLUDED.meta_title,
            meta_description = EXCLUDED.meta_description,
            updated_at = now()
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(subtitle)
    .bind(raw)
    .bind(&username)
    .bind(description)
    .fetch_one(&mut *tx)
    .await?;

    replace_sections(&mut tx, id, sections).await?;

    sqlx::query(
        r#"
        INSERT INTO portfolio_analytics (user_id, date, portfolio_views, unique_visitors)
        VALUES ($1, $2, 0, 0)
        ON CONFLICT (user_id, date) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(today)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        portfolio_id = %id,
        user_id = %user_id,
        subdomain = %username,
        sections = sections.len(),
        "portfolio published"
    );

    Ok(PublishedPortfolio {
        id,
        subdomain: username,
    })
}

pub async fn find_published(
    pool: &PgPool,
    key: &PublishedKey,
) -> Result<Option<PortfolioWithOwner>, sqlx::Error> {
    const SELECT: &str = r#"
        SELECT p.id, p.user_id, p.title, p.subtitle, p.template_id, p.theme_settings,
               p.is_published, p.subdomain, p.meta_title, p.meta_description, p.custom_css,
               p.favicon_url, p.created_at, p.updated_at,
               u.username, u.full_name, u.profile_image, u.bio
        FROM portfolios p
        JOIN users u ON p.user_id = u.id
        "#;

    match key {
        PublishedKey::Subdomain(subdomain) => {
            sqlx::query_as::<_, PortfolioWithOwner>(&format!(
                "{} WHERE p.subdomain = $1 AND p.is_published = true",
                SELECT
            ))
            .bind(subdomain)
            .fetch_optional(pool)
            .await
        }
        PublishedKey::Id(id) => {
            sqlx::query_as::<_, PortfolioWithOwner>(&format!(
                "{} WHERE p.id = $1 AND p.is_published = true",
                SELECT
            ))
            .bind(id)
            .fetch_optional(pool)
            .await
        }
    }
}

/// Visible sections in display order; equal sort orders keep insertion order.
pub async fn visible_sections(
    pool: &PgPool,
    portfolio_id: Uuid,
) -> Result<Vec<PortfolioSection>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioSection>(
        r#"
        SELECT section_type, title, content, media_urls, settings, sort_order
        FROM portfolio_sections
        WHERE portfolio_id = $1 AND is_visible = true
        ORDER BY sort_order ASC, created_at ASC, id ASC
        "#,
    )
    .bind(portfolio_id)
    .fetch_all(pool)
    .await
}

/// Count one view for the day. A new row starts at 1/1; an existing row only
/// has `portfolio_views` bumped. Visitors are not deduplicated.
pub async fn record_view(
    pool: &PgPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<PortfolioViews, sqlx::Error> {
    sqlx::query_as::<_, PortfolioViews>(
        r#"
        INSERT INTO portfolio_analytics (user_id, date, portfolio_views, unique_visitors)
        VALUES ($1, $2, 1, 1)
        ON CONFLICT (user_id, date)
        DO UPDATE SET portfolio_views = portfolio_analytics.portfolio_views + 1
        RETURNING user_id, date, portfolio_views, unique_visitors
        "#,
    )
    .bind(user_id)
    .bind(today)
    .fetch_one(pool)
    .await
}

pub async fn views_on(
    pool: &PgPool,
    user_id: Uuid,
    date: NaiveDate,
) -> Result<Option<PortfolioViews>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioViews>(
        r#"
        SELECT user_id, date, portfolio_views, unique_visitors
        FROM portfolio_analytics
        WHERE user_id = $1 AND date = $2
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

/// Load a published portfolio for a visitor and count the view.
pub async fn get_published(
    pool: &PgPool,
    key: &PublishedKey,
    today: NaiveDate,
) -> AppResult<PublishedView> {
    let portfolio = find_published(pool, key)
        .await?
        .ok_or_else(|| AppError::not_found("Portfolio not found"))?;

    let sections = visible_sections(pool, portfolio.portfolio.id).await?;
    let social_accounts = active_accounts(pool, portfolio.portfolio.user_id).await?;
    let views = record_view(pool, portfolio.portfolio.user_id, today).await?;

    tracing::debug!(
        portfolio_id = %portfolio.portfolio.id,
        views = views.portfolio_views,
        "published portfolio served"
    );

    Ok(PublishedView {
        portfolio,
        sections,
        social_accounts,
        views,
    })
}
