/**
 * Social Platforms
 * Provider abstraction for profile metrics and growth reporting over
 * daily snapshots
 */
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::db::models::SocialSnapshot;
use crate::error::AppError;

/// Supported social platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Youtube,
    Tiktok,
    Twitter,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "instagram" => Some(Platform::Instagram),
            "youtube" => Some(Platform::Youtube),
            "tiktok" => Some(Platform::Tiktok),
            "twitter" | "x" => Some(Platform::Twitter),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile metrics as reported by a platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub username: String,
    pub followers_count: i64,
    pub posts_count: i64,
    pub engagement_rate: f64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reach: i64,
    pub impressions: i64,
}

#[async_trait]
pub trait SocialProvider: Send + Sync {
    async fn fetch_profile(
        &self,
        platform: Platform,
        access_token: &str,
        username: &str,
    ) -> Result<SocialProfile, AppError>;
}

/// Stand-in for the platform APIs: plausible random metrics.
#[derive(Debug, Clone, Default)]
pub struct SimulatedProvider;

impl SimulatedProvider {
    fn simulate(username: &str) -> SocialProfile {
        let mut rng = rand::rng();
        let engagement: f64 = rng.random_range(2.0..12.0);

        SocialProfile {
            username: username.to_string(),
            followers_count: rng.random_range(1_000..11_000),
            posts_count: rng.random_range(50..550),
            engagement_rate: (engagement * 100.0).round() / 100.0,
            likes_count: rng.random_range(1_000..6_000),
            comments_count: rng.random_range(50..550),
            reach: rng.random_range(5_000..55_000),
            impressions: rng.random_range(10_000..110_000),
        }
    }
}

#[async_trait]
impl SocialProvider for SimulatedProvider {
    async fn fetch_profile(
        &self,
        platform: Platform,
        _access_token: &str,
        username: &str,
    ) -> Result<SocialProfile, AppError> {
        tracing::debug!(platform = %platform, username = %username, "simulating profile fetch");
        Ok(Self::simulate(username))
    }
}

/// Change between the two most recent snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    /// Percent change in followers, one decimal
    pub followers: String,
    /// Raw difference in engagement rate, one decimal
    pub engagement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_followers: i64,
    pub total_posts: i64,
    pub avg_engagement: String,
    pub total_reach: i64,
}

/// `snapshots` must be ordered newest first.
pub fn growth(snapshots: &[SocialSnapshot]) -> Growth {
    let latest = snapshots.first();
    let previous = snapshots.get(1);

    let followers = match (latest, previous) {
        (Some(l), Some(p)) if l.followers_count != 0 && p.followers_count != 0 => {
            let change =
                (l.followers_count - p.followers_count) as f64 / p.followers_count as f64 * 100.0;
            format!("{:.1}", change)
        }
        _ => "0".to_string(),
    };

    let engagement = match (latest, previous) {
        (Some(l), Some(p)) if l.engagement_rate != 0.0 && p.engagement_rate != 0.0 => {
            format!("{:.1}", l.engagement_rate - p.engagement_rate)
        }
        _ => "0".to_string(),
    };

    Growth {
        followers,
        engagement,
    }
}

/// `snapshots` must be ordered newest first.
pub fn summarize(snapshots: &[SocialSnapshot]) -> AnalyticsSummary {
    let latest = snapshots.first();
    let avg_engagement = if snapshots.is_empty() {
        "0".to_string()
    } else {
        let total: f64 = snapshots.iter().map(|s| s.engagement_rate).sum();
        format!("{:.2}", total / snapshots.len() as f64)
    };

    AnalyticsSummary {
        total_followers: latest.map(|s| s.followers_count).unwrap_or(0),
        total_posts: latest.map(|s| s.posts_count).unwrap_or(0),
        avg_engagement,
        total_reach: snapshots.iter().map(|s| s.reach).sum(),
    }
}
