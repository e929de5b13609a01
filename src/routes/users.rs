/**
 * User Routes
 * Signup (user + default portfolio) and user listing
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

use crate::db::{
    self,
    models::{NewUser, PortfolioSummary, User},
};
use crate::error::{AppError, AppResult};
use crate::password::hash_password_blocking;
use crate::routes::{json_body, present, query_params, Pagination};
use crate::state::AppState;
use crate::validation::{is_valid_email, is_valid_username, page_bounds, Plan, MIN_PASSWORD_LEN};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

/// Signup input after validation
#[derive(Debug, PartialEq)]
pub struct ValidSignup {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password: String,
    pub plan: Plan,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub user: User,
    pub portfolio: PortfolioSummary,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub plan: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub success: bool,
    pub users: Vec<User>,
    pub pagination: Pagination,
}

// ============================================================================
// Validation
// ============================================================================

pub fn validate_signup(req: SignupRequest) -> AppResult<ValidSignup> {
    let (email, username, full_name, password) = match (
        present(req.email),
        present(req.username),
        present(req.full_name),
        req.password.filter(|p| !p.is_empty()),
    ) {
        (Some(e), Some(u), Some(f), Some(p)) => (e, u, f, p),
        _ => {
            return Err(AppError::invalid(
                "Missing required fields: email, username, full_name, password",
            ))
        }
    };

    if !is_valid_email(&email) {
        return Err(AppError::invalid("Invalid email format"));
    }

    if !is_valid_username(&username) {
        return Err(AppError::invalid(
            "Username must be 3-30 characters and contain only letters, numbers, hyphens, and underscores",
        ));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let plan = match present(req.plan) {
        None => Plan::Free,
        Some(raw) => Plan::parse(&raw)
            .ok_or_else(|| AppError::invalid("Invalid plan. Must be: free, pro, or premium"))?,
    };

    Ok(ValidSignup {
        email,
        username,
        full_name,
        password,
        plan,
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/users
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let signup = validate_signup(json_body(payload)?)?;
    let pool = state.pool()?;

    if db::users::email_or_username_taken(pool, &signup.email, &signup.username).await? {
        return Err(AppError::conflict("Email or username already exists"));
    }

    let password_hash = hash_password_blocking(signup.password).await?;

    let new_user = NewUser {
        email: signup.email,
        username: signup.username,
        full_name: signup.full_name,
        password_hash,
        plan: signup.plan.as_str().to_string(),
    };

    let (user, portfolio) = db::users::create_with_defaults(pool, &new_user).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            user,
            portfolio,
        }),
    ))
}

/// GET /api/users?plan=&limit=&offset=
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> AppResult<Json<ListUsersResponse>> {
    let query = query_params(query)?;
    let (limit, offset) = page_bounds(query.limit.as_deref(), query.offset.as_deref());
    // Unknown plan values are ignored rather than rejected.
    let plan = query.plan.as_deref().and_then(Plan::parse);

    let pool = state.pool()?;
    let (users, total) = db::users::list(pool, plan, limit, offset).await?;

    Ok(Json(ListUsersResponse {
        success: true,
        users,
        pagination: Pagination {
            limit,
            offset,
            total,
        },
    }))
}

// ============================================================================
// Tests
// ============================================================================
