/**
 * Portfolio Routes
 * Listing, create-or-update by user, and partial updates by id
 */
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::{
    self,
    models::{NewPortfolioSection, Portfolio, PortfolioWithOwner},
    portfolios::{build_sections, PortfolioData, PortfolioFilter, PortfolioPatch, SectionInput},
};
use crate::error::{AppError, AppResult};
use crate::routes::{json_body, present, query_params, Pagination};
use crate::state::AppState;
use crate::validation::page_bounds;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/portfolios
#[derive(Debug, Deserialize)]
pub struct ListPortfoliosQuery {
    #[serde(alias = "userId")]
    pub user_id: Option<Uuid>,
    pub subdomain: Option<String>,
    pub published: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListPortfoliosResponse {
    pub success: bool,
    pub portfolios: Vec<PortfolioWithOwner>,
    pub pagination: Pagination,
}

/// Request body for POST /api/portfolios
#[derive(Debug, Deserialize)]
pub struct SavePortfolioRequest {
    #[serde(default, alias = "userId")]
    pub user_id: Option<Uuid>,
    #[serde(default, alias = "portfolioData")]
    pub portfolio_data: Option<Value>,
    #[serde(flatten)]
    pub patch: PortfolioPatch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePortfolioResponse {
    pub success: bool,
    pub portfolio_id: Uuid,
    /// Public host, e.g. `abc123.elysien.com`
    pub subdomain: String,
    pub message: String,
}

/// Request body for PUT /api/portfolios
#[derive(Debug, Deserialize)]
pub struct PatchPortfolioRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub sections: Option<Vec<SectionInput>>,
    #[serde(flatten)]
    pub patch: PortfolioPatch,
}

#[derive(Debug, Serialize)]
pub struct PatchPortfolioResponse {
    pub success: bool,
    pub portfolio: Portfolio,
    pub message: String,
}

impl SavePortfolioRequest {
    /// Fold the builder payload into the patch and derive the section set.
    fn into_parts(self) -> AppResult<(Uuid, PortfolioPatch, Option<Vec<NewPortfolioSection>>)> {
        let user_id = self
            .user_id
            .ok_or_else(|| AppError::invalid("Missing required fields: user_id or userId"))?;

        let mut patch = self.patch;
        let sections = match self.portfolio_data.filter(|v| !v.is_null()) {
            Some(raw) => {
                let data = PortfolioData::from_value(&raw)?;
                patch.merge_builder_data(&data, &raw);
                data.sections.as_deref().map(build_sections)
            }
            None => None,
        };

        Ok((user_id, patch, sections))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/portfolios?user_id=&subdomain=&published=true&limit=&offset=
pub async fn list_portfolios(
    State(state): State<AppState>,
    query: Result<Query<ListPortfoliosQuery>, QueryRejection>,
) -> AppResult<Json<ListPortfoliosResponse>> {
    let query = query_params(query)?;
    let (limit, offset) = page_bounds(query.limit.as_deref(), query.offset.as_deref());
    let filter = PortfolioFilter {
        user_id: query.user_id,
        subdomain: present(query.subdomain).map(|s| state.config.strip_root_domain(&s).to_string()),
        published_only: query.published.as_deref() == Some("true"),
    };

    let pool = state.pool()?;
    let (portfolios, total) = db::portfolios::list(pool, &filter, limit, offset).await?;

    Ok(Json(ListPortfoliosResponse {
        success: true,
        portfolios,
        pagination: Pagination {
            limit,
            offset,
            total,
        },
    }))
}

/// POST /api/portfolios
pub async fn save_portfolio(
    State(state): State<AppState>,
    payload: Result<Json<SavePortfolioRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SavePortfolioResponse>)> {
    let (user_id, patch, sections) = json_body(payload)?.into_parts()?;
    let pool = state.pool()?;

    let saved = db::portfolios::upsert_for_user(pool, user_id, &patch, sections.as_deref()).await?;

    Ok((
        StatusCode::CREATED,
        Json(SavePortfolioResponse {
            success: true,
            portfolio_id: saved.id,
            subdomain: state.config.public_host(&saved.subdomain),
            message: "Portfolio saved successfully".to_string(),
        }),
    ))
}

/// PUT /api/portfolios
pub async fn patch_portfolio(
    State(state): State<AppState>,
    payload: Result<Json<PatchPortfolioRequest>, JsonRejection>,
) -> AppResult<Json<PatchPortfolioResponse>> {
    let req = json_body(payload)?;
    let id = req
        .id
        .ok_or_else(|| AppError::invalid("Portfolio ID is required"))?;
    let sections = req.sections.as_deref().map(build_sections);

    if req.patch.is_empty() && sections.is_none() {
        return Err(AppError::invalid("No fields to update"));
    }

    let pool = state.pool()?;
    let portfolio = db::portfolios::patch_by_id(pool, id, &req.patch, sections.as_deref()).await?;

    Ok(Json(PatchPortfolioResponse {
        success: true,
        portfolio,
        message: "Portfolio updated successfully".to_string(),
    }))
}

// ============================================================================
// Tests
// ============================================================================
