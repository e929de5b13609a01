/**
 * Routes Module
 * API route handlers
 */

pub mod auth;
pub mod health;
pub mod portfolio;
pub mod publish;
pub mod social;
pub mod templates;
pub mod users;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Unwrap a JSON body. Malformed input is a 400; oversized bodies and
/// missing content types keep their own status.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::rejection(e.status(), e.body_text()))
}

/// Unwrap query parameters, turning malformed input into a 400.
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    query
        .map(|Query(params)| params)
        .map_err(|e| AppError::rejection(e.status(), e.body_text()))
}

/// Trimmed, non-empty string or `None`
pub fn present(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Pagination block returned by list endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}
