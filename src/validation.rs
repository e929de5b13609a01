/**
 * Input Validation
 * Shared format checks for usernames, subdomains, emails and plans
 */
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

lazy_static::lazy_static! {
    /// Usernames and subdomains: 3-30 letters, digits, hyphens or underscores
    static ref SLUG_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]{3,30}$").unwrap();

    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 8;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;

pub fn is_valid_subdomain(subdomain: &str) -> bool {
    SLUG_REGEX.is_match(subdomain)
}

pub fn is_valid_username(username: &str) -> bool {
    SLUG_REGEX.is_match(username)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

pub fn validate_subdomain(subdomain: &str) -> Result<(), AppError> {
    if is_valid_subdomain(subdomain) {
        Ok(())
    } else {
        Err(AppError::invalid(
            "Invalid subdomain format. Must be 3-30 characters with letters, numbers, hyphens, and underscores only.",
        ))
    }
}

/// Clamp client-supplied pagination to sane bounds. Values that are not
/// integers fall back to the defaults.
pub fn page_bounds(limit: Option<&str>, offset: Option<&str>) -> (i64, i64) {
    let parse = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<i64>().ok());
    let limit = parse(limit)
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .min(MAX_PAGE_LIMIT);
    let offset = parse(offset).unwrap_or(0).max(0);
    (limit, offset)
}

/// Subscription plan of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Premium => "premium",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Plan::Free),
            "pro" => Some(Plan::Pro),
            "premium" => Some(Plan::Premium),
            _ => None,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
