//! Social account and daily snapshot queries.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{SocialAccount, SocialSnapshot};
use super::users::username_of;
use crate::error::{AppError, AppResult};
use crate::social::{Platform, SocialProfile};

const ACCOUNT_COLUMNS: &str = "id, platform, username, followers_count, posts_count, \
     engagement_rate, last_synced_at, is_active";

/// Store freshly fetched metrics for (user, platform) and merge them into
/// today's snapshot, in one transaction.
pub async fn connect(
    pool: &PgPool,
    user_id: Uuid,
    platform: Platform,
    access_token: &str,
    profile: &SocialProfile,
    today: NaiveDate,
) -> AppResult<SocialAccount> {
    let mut tx = pool.begin().await?;

    if username_of(&mut *tx, user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let account = sqlx::query_as::<_, SocialAccount>(&format!(
        r#"
        INSERT INTO social_accounts (
            user_id, platform, username, access_token,
            followers_count, posts_count, engagement_rate, last_synced_at, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, now(), true)
        ON CONFLICT (user_id, platform) DO UPDATE SET
            username = EXCLUDED.username,
            access_token = EXCLUDED.access_token,
            followers_count = EXCLUDED.followers_count,
            posts_count = EXCLUDED.posts_count,
            engagement_rate = EXCLUDED.engagement_rate,
            last_synced_at = now(),
            is_active = true,
            updated_at = now()
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    ))
    .bind(user_id)
    .bind(platform.as_str())
    .bind(&profile.username)
    .bind(access_token)
    .bind(profile.followers_count)
    .bind(profile.posts_count)
    .bind(profile.engagement_rate)
    .fetch_one(&mut *tx)
    .await?;

    // Likes and comments keep the first value written for the day.
    sqlx::query(
        r#"
        INSERT INTO social_analytics (
            social_account_id, date, followers_count, posts_count,
            likes_count, comments_count, engagement_rate, reach, impressions
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (social_account_id, date) DO UPDATE SET
            followers_count = EXCLUDED.followers_count,
            posts_count = EXCLUDED.posts_count,
            engagement_rate = EXCLUDED.engagement_rate,
            reach = EXCLUDED.reach,
            impressions = EXCLUDED.impressions
        "#,
    )
    .bind(account.id)
    .bind(today)
    .bind(profile.followers_count)
    .bind(profile.posts_count)
    .bind(profile.likes_count)
    .bind(profile.comments_count)
    .bind(profile.engagement_rate)
    .bind(profile.reach)
    .bind(profile.impressions)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        account_id = %account.id,
        user_id = %user_id,
        platform = %platform,
        "social account connected"
    );

    Ok(account)
}

pub async fn find_active(
    pool: &PgPool,
    user_id: Uuid,
    platform: Platform,
) -> Result<Option<SocialAccount>, sqlx::Error> {
    sqlx::query_as::<_, SocialAccount>(&format!(
        "SELECT {} FROM social_accounts \
         WHERE user_id = $1 AND platform = $2 AND is_active = true",
        ACCOUNT_COLUMNS
    ))
    .bind(user_id)
    .bind(platform.as_str())
    .fetch_optional(pool)
    .await
}

pub async fn active_accounts(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<SocialAccount>, sqlx::Error> {
    sqlx::query_as::<_, SocialAccount>(&format!(
        "SELECT {} FROM social_accounts \
         WHERE user_id = $1 AND is_active = true \
         ORDER BY platform",
        ACCOUNT_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Snapshots dated on or after `since`, newest first. An account on another
/// platform yields nothing.
pub async fn snapshots_since(
    pool: &PgPool,
    account_id: Uuid,
    platform: Platform,
    since: NaiveDate,
) -> Result<Vec<SocialSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, SocialSnapshot>(
        r#"
        SELECT sa.date, sa.followers_count, sa.posts_count, sa.likes_count,
               sa.comments_count, sa.engagement_rate, sa.reach, sa.impressions
        FROM social_analytics sa
        JOIN social_accounts a ON a.id = sa.social_account_id
        WHERE sa.social_account_id = $1 AND a.platform = $2 AND sa.date >= $3
        ORDER BY sa.date DESC
        "#,
    )
    .bind(account_id)
    .bind(platform.as_str())
    .bind(since)
    .fetch_all(pool)
    .await
}
