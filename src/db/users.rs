//! User queries: credential lookup, signup with default portfolio, listing.

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{NewPortfolioSection, NewUser, PortfolioSummary, User, UserRecord};
use super::portfolios::insert_sections;
use crate::error::{AppError, AppResult};
use crate::validation::Plan;

const USER_COLUMNS: &str =
    "id, email, username, full_name, plan, profile_image, bio, created_at, updated_at";

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, username, full_name, password_hash, plan, profile_image, bio,
               created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn username_of<'e, E>(executor: E, user_id: Uuid) -> Result<Option<String>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT username FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|(username,)| username))
}

/// Exact, case-sensitive match on either field.
pub async fn email_or_username_taken(
    pool: &PgPool,
    email: &str,
    username: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1 OR username = $2 LIMIT 1")
            .bind(email)
            .bind(username)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

pub async fn portfolio_summary(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<PortfolioSummary>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioSummary>(
        r#"
        SELECT id, title, subtitle, subdomain, is_published, template_id
        FROM portfolios
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Starter sections every new portfolio gets.
pub fn default_sections(full_name: &str) -> Vec<NewPortfolioSection> {
    let canned = [
        (
            "hero",
            format!("Hi, I'm {}", full_name),
            "Welcome to my portfolio! I create amazing content and would love to share my work with you.",
        ),
        (
            "about",
            "About Me".to_string(),
            "Tell your audience about yourself, your journey, and what makes you unique.",
        ),
        (
            "gallery",
            "My Work".to_string(),
            "Showcase your best projects and creative work here.",
        ),
        (
            "contact",
            "Get In Touch".to_string(),
            "Ready to work together? I would love to hear from you.",
        ),
    ];

    canned
        .into_iter()
        .zip(1..)
        .map(|((section_type, title, content), sort_order)| NewPortfolioSection {
            section_type: section_type.to_string(),
            title,
            content: content.to_string(),
            media_urls: serde_json::json!([]),
            settings: serde_json::json!({}),
            sort_order,
            is_visible: true,
        })
        .collect()
}

/// Create a user together with an unpublished default portfolio and its
/// starter sections, all in one transaction.
///
/// The default subdomain is the username, so a username already claimed as
/// another portfolio's custom subdomain is reported as unavailable.
pub async fn create_with_defaults(
    pool: &PgPool,
    new_user: &NewUser,
) -> AppResult<(User, PortfolioSummary)> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (email, username, full_name, password_hash, plan)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(&new_user.email)
    .bind(&new_user.username)
    .bind(&new_user.full_name)
    .bind(&new_user.password_hash)
    .bind(&new_user.plan)
    .fetch_one(&mut *tx)
    .await?;

    let portfolio = sqlx::query_as::<_, PortfolioSummary>(
        r#"
        INSERT INTO portfolios (user_id, title, subtitle, subdomain, is_published)
        VALUES ($1, $2, 'Welcome to my creative space', $3, false)
        RETURNING id, title, subtitle, subdomain, is_published, template_id
        "#,
    )
    .bind(user.id)
    .bind(format!("{}'s Portfolio", user.full_name))
    .bind(&user.username)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::conflict("Username is not available"),
        other => other,
    })?;

    insert_sections(&mut *tx, portfolio.id, &default_sections(&user.full_name)).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user signed up");

    Ok((user, portfolio))
}

/// Newest users first, optionally restricted to one plan.
pub async fn list(
    pool: &PgPool,
    plan: Option<Plan>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<User>, i64), sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");

    if let Some(plan) = plan {
        query.push(" WHERE plan = ").push_bind(plan.as_str());
        count.push(" WHERE plan = ").push_bind(plan.as_str());
    }

    query
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let users = query.build_query_as::<User>().fetch_all(pool).await?;
    let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

    Ok((users, total))
}
