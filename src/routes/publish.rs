/**
 * Publish Routes
 * Publish a portfolio under its owner's username and serve it to visitors
 */
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::{
    self,
    models::{PortfolioSection, PortfolioWithOwner, SocialAccount},
    portfolios::{build_sections, PortfolioData},
    publish::PublishedKey,
};
use crate::error::{AppError, AppResult};
use crate::routes::{json_body, present, query_params};
use crate::state::AppState;
use crate::validation::validate_subdomain;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default, alias = "userId")]
    pub user_id: Option<Uuid>,
    #[serde(default, alias = "portfolioData")]
    pub portfolio_data: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub message: String,
    pub url: String,
    /// Public host, e.g. `abc123.elysien.com`
    pub subdomain: String,
    pub portfolio_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PublishedQuery {
    pub subdomain: Option<String>,
    #[serde(rename = "portfolioId", alias = "portfolio_id")]
    pub portfolio_id: Option<Uuid>,
}

/// Public page payload. `subdomain` inside `portfolio` is the public host;
/// `slug` is the stored value.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPortfolio {
    #[serde(flatten)]
    pub portfolio: PortfolioWithOwner,
    pub slug: String,
    pub url: String,
    pub sections: Vec<PortfolioSection>,
    pub social_accounts: Vec<SocialAccount>,
    pub theme_settings: Value,
}

#[derive(Debug, Serialize)]
pub struct PublishedResponse {
    pub success: bool,
    pub portfolio: PublicPortfolio,
}

impl PublishedQuery {
    /// Exactly one lookup key; a full public host is reduced to its slug.
    fn key(self, state: &AppState) -> AppResult<PublishedKey> {
        match (present(self.subdomain), self.portfolio_id) {
            (Some(_), Some(_)) => Err(AppError::invalid(
                "Provide either subdomain or portfolioId, not both",
            )),
            (Some(subdomain), None) => {
                let slug = state.config.strip_root_domain(&subdomain);
                validate_subdomain(slug)?;
                Ok(PublishedKey::Subdomain(slug.to_string()))
            }
            (None, Some(id)) => Ok(PublishedKey::Id(id)),
            (None, None) => Err(AppError::invalid(
                "Missing subdomain or portfolioId parameter",
            )),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/portfolios/publish
pub async fn publish_portfolio(
    State(state): State<AppState>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> AppResult<Json<PublishResponse>> {
    let req = json_body(payload)?;
    let (user_id, raw) = match (req.user_id, req.portfolio_data.filter(|v| !v.is_null())) {
        (Some(user_id), Some(raw)) => (user_id, raw),
        _ => {
            return Err(AppError::invalid(
                "Missing required fields: userId, portfolioData",
            ))
        }
    };

    let data = PortfolioData::from_value(&raw)?;
    let sections = data
        .sections
        .as_deref()
        .map(build_sections)
        .unwrap_or_default();

    let pool = state.pool()?;
    let today = Utc::now().date_naive();
    let published = db::publish::publish(pool, user_id, &data, &raw, &sections, today).await?;

    Ok(Json(PublishResponse {
        success: true,
        message: "Portfolio published successfully".to_string(),
        url: state.config.public_url(&published.subdomain),
        subdomain: state.config.public_host(&published.subdomain),
        portfolio_id: published.id,
    }))
}

/// GET /api/portfolios/publish?subdomain= | ?portfolioId=
pub async fn get_published(
    State(state): State<AppState>,
    query: Result<Query<PublishedQuery>, QueryRejection>,
) -> AppResult<Json<PublishedResponse>> {
    let key = query_params(query)?.key(&state)?;
    let pool = state.pool()?;

    let view = db::publish::get_published(pool, &key, Utc::now().date_naive()).await?;

    let mut portfolio = view.portfolio;
    let slug = std::mem::take(&mut portfolio.portfolio.subdomain);
    portfolio.portfolio.subdomain = state.config.public_host(&slug);
    let theme_settings = portfolio.portfolio.theme_settings.clone();

    Ok(Json(PublishedResponse {
        success: true,
        portfolio: PublicPortfolio {
            url: state.config.public_url(&slug),
            slug,
            portfolio,
            sections: view.sections,
            social_accounts: view.social_accounts,
            theme_settings,
        },
    }))
}

// ============================================================================
// Tests
// ============================================================================
