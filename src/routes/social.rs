/**
 * Social Routes
 * Connect a platform account, read it back, and report snapshot analytics
 */
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::{Days, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    self,
    models::{SocialAccount, SocialSnapshot},
};
use crate::error::{AppError, AppResult};
use crate::routes::{json_body, present, query_params};
use crate::social::{self as metrics, AnalyticsSummary, Growth, Platform};
use crate::state::AppState;

const DEFAULT_ANALYTICS_DAYS: u64 = 30;
const MAX_ANALYTICS_DAYS: u64 = 365;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(default, alias = "userId")]
    pub user_id: Option<Uuid>,
    #[serde(default, alias = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectedAccount {
    #[serde(flatten)]
    pub account: SocialAccount,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub account: ConnectedAccount,
}

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub account: Option<SocialAccount>,
    pub connected: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsRequest {
    #[serde(default, alias = "accountId")]
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub analytics: Vec<SocialSnapshot>,
    pub growth: Growth,
    pub summary: AnalyticsSummary,
}

fn platform_from_path(raw: &str) -> AppResult<Platform> {
    Platform::parse(raw)
        .ok_or_else(|| AppError::invalid(format!("Unsupported platform: {}", raw)))
}

fn analytics_window(days: Option<i64>) -> AppResult<u64> {
    match days {
        None => Ok(DEFAULT_ANALYTICS_DAYS),
        Some(d) if (1..=MAX_ANALYTICS_DAYS as i64).contains(&d) => Ok(d as u64),
        Some(_) => Err(AppError::invalid(format!(
            "days must be between 1 and {}",
            MAX_ANALYTICS_DAYS
        ))),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/social/{platform}
pub async fn connect_account(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> AppResult<Json<ConnectResponse>> {
    let platform = platform_from_path(&platform)?;
    let req = json_body(payload)?;

    let (user_id, access_token, username) =
        match (req.user_id, present(req.access_token), present(req.username)) {
            (Some(u), Some(t), Some(n)) => (u, t, n),
            _ => {
                return Err(AppError::invalid(
                    "Missing required fields: userId, accessToken, username",
                ))
            }
        };

    let pool = state.pool()?;
    let profile = state
        .social
        .fetch_profile(platform, &access_token, &username)
        .await?;

    let today = Utc::now().date_naive();
    let account =
        db::social::connect(pool, user_id, platform, &access_token, &profile, today).await?;

    Ok(Json(ConnectResponse {
        success: true,
        account: ConnectedAccount {
            account,
            connected: true,
        },
    }))
}

/// GET /api/social/{platform}?userId=
pub async fn get_account(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> AppResult<Json<AccountResponse>> {
    let platform = platform_from_path(&platform)?;
    let user_id = query_params(query)?
        .user_id
        .ok_or_else(|| AppError::invalid("Missing userId parameter"))?;

    let pool = state.pool()?;
    let account = db::social::find_active(pool, user_id, platform).await?;

    Ok(Json(AccountResponse {
        success: true,
        connected: account.is_some(),
        account,
    }))
}

/// PUT /api/social/{platform}
pub async fn get_analytics(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    payload: Result<Json<AnalyticsRequest>, JsonRejection>,
) -> AppResult<Json<AnalyticsResponse>> {
    let platform = platform_from_path(&platform)?;
    let req = json_body(payload)?;
    let account_id = req
        .account_id
        .ok_or_else(|| AppError::invalid("Missing accountId"))?;
    let days = analytics_window(req.days)?;

    let pool = state.pool()?;
    let today = Utc::now().date_naive();
    let since = today.checked_sub_days(Days::new(days)).unwrap_or(today);
    let analytics = db::social::snapshots_since(pool, account_id, platform, since).await?;

    Ok(Json(AnalyticsResponse {
        success: true,
        growth: metrics::growth(&analytics),
        summary: metrics::summarize(&analytics),
        analytics,
    }))
}

// ============================================================================
// Tests
// ============================================================================
