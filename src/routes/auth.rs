/**
 * Authentication Routes
 * Email + password login against stored argon2 hashes
 */
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::db::{
    self,
    models::{PortfolioSummary, User},
};
use crate::error::{AppError, AppResult};
use crate::password::verify_password_blocking;
use crate::routes::{json_body, present};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// User projection plus their portfolio summary
#[derive(Debug, Serialize)]
pub struct UserWithPortfolio {
    #[serde(flatten)]
    pub user: User,
    pub portfolio: Option<PortfolioSummary>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserWithPortfolio,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let req = json_body(payload)?;

    let (email, password) = match (present(req.email), req.password) {
        (Some(email), Some(password)) if !password.is_empty() => (email, password),
        _ => return Err(AppError::invalid("Email and password are required")),
    };

    let pool = state.pool()?;

    let record = match db::users::find_by_email(pool, &email).await? {
        Some(record) => record,
        None => {
            tracing::warn!("Login failed: unknown email");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    if !verify_password_blocking(password, record.password_hash.clone()).await {
        tracing::warn!(user_id = %record.id, "Login failed: wrong password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let portfolio = db::users::portfolio_summary(pool, record.id).await?;

    tracing::info!(user_id = %record.id, "Login successful");

    Ok(Json(LoginResponse {
        success: true,
        user: UserWithPortfolio {
            user: record.into(),
            portfolio,
        },
    }))
}

// ============================================================================
// Tests
// ============================================================================
