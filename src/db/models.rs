//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Full user row, including the password hash. Never serialized to clients.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password_hash: String,
    pub plan: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public user projection (no password hash)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub plan: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            email: r.email,
            username: r.username,
            full_name: r.full_name,
            plan: r.plan,
            profile_image: r.profile_image,
            bio: r.bio,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// New user for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password_hash: String,
    pub plan: String,
}

/// Portfolio model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub template_id: String,
    pub theme_settings: Value,
    pub is_published: bool,
    pub subdomain: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub custom_css: Option<String>,
    pub favicon_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Portfolio summary embedded in login/signup responses
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub subdomain: String,
    pub is_published: bool,
    pub template_id: String,
}

/// Portfolio joined with its owner's public profile
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PortfolioWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub username: String,
    pub full_name: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
}

/// Portfolio section model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PortfolioSection {
    pub section_type: String,
    pub title: Option<String>,
    pub content: String,
    pub media_urls: Value,
    pub settings: Value,
    pub sort_order: i32,
}

/// Section ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewPortfolioSection {
    pub section_type: String,
    pub title: String,
    pub content: String,
    pub media_urls: Value,
    pub settings: Value,
    pub sort_order: i32,
    pub is_visible: bool,
}

/// Template model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub preview_image: Option<String>,
    pub template_data: Value,
    pub is_premium: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// New template for creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub preview_image: Option<String>,
    pub template_data: Value,
    pub is_premium: bool,
}

/// Social account as shown to clients (no access token)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SocialAccount {
    pub id: Uuid,
    pub platform: String,
    pub username: String,
    pub followers_count: i64,
    pub posts_count: i64,
    pub engagement_rate: f64,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Daily snapshot of a social account's metrics
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SocialSnapshot {
    pub date: NaiveDate,
    pub followers_count: i64,
    pub posts_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub engagement_rate: f64,
    pub reach: i64,
    pub impressions: i64,
}

/// Per-day portfolio view counters
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PortfolioViews {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub portfolio_views: i64,
    pub unique_visitors: i64,
}
