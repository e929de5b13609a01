//! Database-backed flows. Skipped unless DATABASE_URL points at a Postgres
//! instance the tests may create tables in.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Days, Utc};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

use portfolio_builder::config::AppConfig;
use portfolio_builder::db::{
    self,
    models::{NewPortfolioSection, NewUser},
    portfolios::{build_sections, PortfolioData, PortfolioPatch},
};
use portfolio_builder::error::AppError;
use portfolio_builder::social::{Platform, SocialProfile, SocialProvider};
use portfolio_builder::state::AppState;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");

    MIGRATED
        .get_or_init(|| async {
            db::run_migrations(&pool).await.expect("migrations");
        })
        .await;

    Some(pool)
}

struct FixedProvider {
    followers: i64,
}

#[async_trait]
impl SocialProvider for FixedProvider {
    async fn fetch_profile(
        &self,
        _platform: Platform,
        _access_token: &str,
        username: &str,
    ) -> Result<SocialProfile, AppError> {
        Ok(SocialProfile {
            username: username.to_string(),
            followers_count: self.followers,
            posts_count: 120,
            engagement_rate: 5.5,
            likes_count: 2000,
            comments_count: 100,
            reach: 10_000,
            impressions: 20_000,
        })
    }
}

fn app(pool: &PgPool) -> Router {
    let config = AppConfig {
        root_domain: "elysien.com".to_string(),
        ..AppConfig::default()
    };
    let state = AppState::new(Some(pool.clone()), config)
        .with_social_provider(Arc::new(FixedProvider { followers: 1100 }));
    portfolio_builder::create_app(state)
}

fn unique_username() -> String {
    format!("u{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Sign up through the API and return (user_id, username).
async fn signup(app: &Router) -> (Uuid, String) {
    let username = unique_username();
    let (status, body) = send(
        app,
        "POST",
        "/api/users",
        Some(json!({
            "email": format!("{}@example.com", username),
            "username": username,
            "full_name": "Test Creator",
            "password": "correct horse"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

    let id = body["user"]["id"].as_str().unwrap().parse().unwrap();
    (id, username)
}

fn builder_data(subdomain: &str) -> Value {
    json!({
        "title": "Studio Works",
        "subtitle": "Photos and film",
        "bio": "Shooting since 2015",
        "subdomain": subdomain,
        "sections": [
            {"type": "hero", "enabled": true, "title": "Hi", "data": {"content": "Hello there"}},
            {"type": "about", "enabled": false, "data": {"content": "hidden"}},
            {"type": "contact", "enabled": true, "data": {"description": "Mail me"}}
        ]
    })
}

fn section_set(raw: &Value) -> Vec<NewPortfolioSection> {
    let data = PortfolioData::from_value(raw).unwrap();
    build_sections(data.sections.as_deref().unwrap_or_default())
}

/// A user row with no portfolio yet.
async fn bare_user(pool: &PgPool) -> Uuid {
    let username = unique_username();
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO users (email, username, full_name, password_hash) \
         VALUES ($1, $2, 'Bare User', 'x') RETURNING id",
    )
    .bind(format!("{}@example.com", username))
    .bind(&username)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

#[tokio::test]
async fn signup_creates_user_with_default_portfolio() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);

    let username = unique_username();
    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({
            "email": format!("{}@example.com", username),
            "username": username,
            "fullName": "Ada Maker",
            "password": "correct horse",
            "plan": "pro"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["user"].get("password_hash").is_none());
    assert_eq!(body["user"]["plan"], "pro");
    assert_eq!(body["portfolio"]["subdomain"], username.as_str());
    assert_eq!(body["portfolio"]["title"], "Ada Maker's Portfolio");
    assert_eq!(body["portfolio"]["is_published"], false);

    let portfolio_id: Uuid = body["portfolio"]["id"].as_str().unwrap().parse().unwrap();
    let sections = db::publish::visible_sections(&pool, portfolio_id).await.unwrap();
    let types: Vec<&str> = sections.iter().map(|s| s.section_type.as_str()).collect();
    assert_eq!(types, ["hero", "about", "gallery", "contact"]);
    let orders: Vec<i32> = sections.iter().map(|s| s.sort_order).collect();
    assert_eq!(orders, [1, 2, 3, 4]);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": format!("{}@example.com", username), "password": "correct horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["portfolio"]["id"], portfolio_id.to_string());
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": format!("{}@example.com", username), "password": "wrong horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn duplicate_email_or_username_conflicts() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let (_, username) = signup(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({
            "email": format!("{}@example.com", username),
            "username": unique_username(),
            "full_name": "Someone Else",
            "password": "correct horse"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email or username already exists");

    // Racing past the pre-check still lands on the unique constraint.
    let err = db::users::create_with_defaults(
        &pool,
        &NewUser {
            email: format!("other-{}@example.com", username),
            username: username.clone(),
            full_name: "Racer".to_string(),
            password_hash: "x".to_string(),
            plan: "free".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn saving_the_same_data_twice_matches_saving_once() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let (user_id, username) = signup(&app).await;

    let request = json!({"userId": user_id, "portfolioData": builder_data(&username)});

    let (status, first) = send(&app, "POST", "/api/portfolios", Some(request.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["subdomain"], format!("{}.elysien.com", username));

    let portfolio_id: Uuid = first["portfolioId"].as_str().unwrap().parse().unwrap();
    let once = db::publish::visible_sections(&pool, portfolio_id).await.unwrap();

    let (status, second) = send(&app, "POST", "/api/portfolios", Some(request)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["portfolioId"], first["portfolioId"]);

    let twice = db::publish::visible_sections(&pool, portfolio_id).await.unwrap();
    let shape = |sections: &[db::models::PortfolioSection]| -> Vec<(String, Option<String>, String, i32)> {
        sections
            .iter()
            .map(|s| (s.section_type.clone(), s.title.clone(), s.content.clone(), s.sort_order))
            .collect()
    };
    assert_eq!(shape(&once), shape(&twice));
    assert_eq!(
        shape(&once),
        vec![
            ("hero".to_string(), Some("Hi".to_string()), "Hello there".to_string(), 0),
            ("contact".to_string(), Some("contact".to_string()), "Mail me".to_string(), 1),
        ]
    );
}

#[tokio::test]
async fn subdomain_taken_by_another_user_conflicts() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let (_, first_username) = signup(&app).await;
    let (second_id, _) = signup(&app).await;

    let patch = PortfolioPatch {
        subdomain: Some(first_username.clone()),
        ..Default::default()
    };
    let err = db::portfolios::upsert_for_user(&pool, second_id, &patch, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref msg) if msg == "Subdomain already taken"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/portfolios",
        Some(json!({"userId": second_id, "subdomain": "no good"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid subdomain format"));
}

#[tokio::test]
async fn patch_updates_only_given_fields() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let (user_id, _) = signup(&app).await;
    let summary = db::users::portfolio_summary(&pool, user_id)
        .await
        .unwrap()
        .unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        "/api/portfolios",
        Some(json!({"id": summary.id, "subtitle": "New subtitle", "custom_css": "body{}"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["portfolio"]["subtitle"], "New subtitle");
    assert_eq!(body["portfolio"]["custom_css"], "body{}");
    assert_eq!(body["portfolio"]["title"], summary.title.as_str());

    let (status, _) = send(
        &app,
        "PUT",
        "/api/portfolios",
        Some(json!({"id": Uuid::new_v4(), "title": "Ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signup_publish_and_view_end_to_end() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let (user_id, username) = signup(&app).await;
    let lookup = format!("/api/portfolios/publish?subdomain={}", username);

    // Signup portfolios start unpublished.
    let (status, _) = send(&app, "GET", &lookup, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/portfolios/publish",
        Some(json!({"userId": user_id, "portfolioData": builder_data("something-else")})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "publish failed: {}", body);
    assert_eq!(body["url"], format!("https://{}.elysien.com", username));
    assert_eq!(body["subdomain"], format!("{}.elysien.com", username));

    let today = Utc::now().date_naive();
    let after_publish = db::publish::views_on(&pool, user_id, today)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_publish.portfolio_views, 0);

    let (status, body) = send(&app, "GET", &lookup, None).await;
    assert_eq!(status, StatusCode::OK);
    let portfolio = &body["portfolio"];
    assert_eq!(portfolio["is_published"], true);
    assert_eq!(portfolio["subdomain"], format!("{}.elysien.com", username));
    assert_eq!(portfolio["slug"], username.as_str());
    assert_eq!(portfolio["title"], "Studio Works");
    assert_eq!(portfolio["meta_description"], "Shooting since 2015");
    assert_eq!(portfolio["sections"].as_array().unwrap().len(), 2);
    assert_eq!(portfolio["sections"][0]["section_type"], "hero");
    assert_eq!(portfolio["themeSettings"]["title"], "Studio Works");

    // Full host works as a lookup key too.
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/portfolios/publish?subdomain={}.elysien.com", username),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &lookup, None).await;
    assert_eq!(status, StatusCode::OK);

    let views = db::publish::views_on(&pool, user_id, today)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(views.portfolio_views, 3);
    // Visitors are not deduplicated; the publish-time row keeps its count.
    assert_eq!(views.unique_visitors, after_publish.unique_visitors);
}

#[tokio::test]
async fn social_connect_and_growth_report() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let (user_id, _) = signup(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/social/instagram",
        Some(json!({"userId": user_id, "accessToken": "token", "username": "studio.works"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "connect failed: {}", body);
    assert_eq!(body["account"]["connected"], true);
    assert_eq!(body["account"]["followers_count"], 1100);
    let account_id: Uuid = body["account"]["id"].as_str().unwrap().parse().unwrap();

    let yesterday = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(1))
        .unwrap();
    sqlx::query(
        "INSERT INTO social_analytics (social_account_id, date, followers_count, posts_count, engagement_rate, reach) \
         VALUES ($1, $2, 1000, 100, 4.0, 5000)",
    )
    .bind(account_id)
    .bind(yesterday)
    .execute(&pool)
    .await
    .unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        "/api/social/instagram",
        Some(json!({"accountId": account_id, "days": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analytics"].as_array().unwrap().len(), 2);
    assert_eq!(body["growth"]["followers"], "10.0");
    assert_eq!(body["growth"]["engagement"], "1.5");
    assert_eq!(body["summary"]["total_followers"], 1100);
    assert_eq!(body["summary"]["total_reach"], 15_000);

    // The account is on instagram, so a youtube report has no snapshots.
    let (status, body) = send(
        &app,
        "PUT",
        "/api/social/youtube",
        Some(json!({"accountId": account_id, "days": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["analytics"].as_array().unwrap().is_empty());
    assert_eq!(body["summary"]["total_followers"], 0);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/social/instagram?userId={}", user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], true);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/social/youtube?userId={}", user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], false);
    assert!(body["account"].is_null());

    let (status, _) = send(
        &app,
        "POST",
        "/api/social/instagram",
        Some(json!({"userId": Uuid::new_v4(), "accessToken": "t", "username": "ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn template_catalog_lists_free_first() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let category = format!("cat-{}", Uuid::new_v4().simple());

    for (name, premium) in [("Premium One", true), ("Free One", false)] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/templates",
            Some(json!({
                "name": name,
                "category": category,
                "template_data": {"layout": "grid"},
                "is_premium": premium
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Template created successfully");
    }

    let (status, body) = send(&app, "GET", &format!("/api/templates?category={}", category), None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["templates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Free One", "Premium One"]);
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/templates?category={}&premium=true&free=true", category),
        None,
    )
    .await;
    assert_eq!(body["templates"].as_array().unwrap().len(), 1);
    assert_eq!(body["templates"][0]["name"], "Premium One");

    // Legacy rows store the payload as an encoded string.
    let (id,): (String,) = sqlx::query_as(
        "INSERT INTO templates (name, template_data) VALUES ('Legacy', to_jsonb($1::text)) RETURNING id",
    )
    .bind(r#"{"layout":"stack"}"#)
    .fetch_one(&pool)
    .await
    .unwrap();

    let (status, body) = send(&app, "GET", &format!("/api/templates/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["template"]["template_data"]["layout"], "stack");

    let (status, _) = send(&app, "GET", "/api/templates/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_first_saves_create_one_portfolio() {
    let Some(pool) = test_pool().await else { return };
    let user_id = bare_user(&pool).await;
    let sections = section_set(&builder_data("unused"));

    let mut saves = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let sections = sections.clone();
        saves.spawn(async move {
            db::portfolios::upsert_for_user(
                &pool,
                user_id,
                &PortfolioPatch::default(),
                Some(sections.as_slice()),
            )
            .await
        });
    }

    let mut ids = Vec::new();
    while let Some(joined) = saves.join_next().await {
        let saved = joined.unwrap().expect("every concurrent save succeeds");
        ids.push(saved.id);
    }
    assert_eq!(ids.len(), 8);
    assert!(ids.iter().all(|id| *id == ids[0]));

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM portfolios WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let stored = db::publish::visible_sections(&pool, ids[0]).await.unwrap();
    assert_eq!(stored.len(), sections.len());
}

#[tokio::test]
async fn readers_never_see_sections_missing_during_saves() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let (user_id, username) = signup(&app).await;
    let portfolio_id = db::users::portfolio_summary(&pool, user_id)
        .await
        .unwrap()
        .unwrap()
        .id;

    let two = section_set(&builder_data(&username));
    let three = section_set(&json!({
        "sections": [
            {"type": "hero", "enabled": true, "data": {"content": "A"}},
            {"type": "gallery", "enabled": true, "data": {"content": "B"}},
            {"type": "contact", "enabled": true, "data": {"content": "C"}}
        ]
    }));
    assert_eq!((two.len(), three.len()), (2, 3));

    let writer_pool = pool.clone();
    let writer = tokio::spawn(async move {
        for round in 0..25 {
            let sections = if round % 2 == 0 { &two } else { &three };
            db::portfolios::upsert_for_user(
                &writer_pool,
                user_id,
                &PortfolioPatch::default(),
                Some(sections.as_slice()),
            )
            .await
            .unwrap();
        }
    });

    let mut seen = Vec::new();
    for _ in 0..100 {
        let sections = db::publish::visible_sections(&pool, portfolio_id).await.unwrap();
        seen.push(sections.len());
    }
    writer.await.unwrap();

    // Signup leaves 4 sections; every save leaves 2 or 3.
    assert!(seen.iter().all(|n| [2, 3, 4].contains(n)), "saw {:?}", seen);
}

#[tokio::test]
async fn lookup_by_id_hides_unpublished_and_first_view_starts_at_one() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let (user_id, _) = signup(&app).await;
    let portfolio_id = db::users::portfolio_summary(&pool, user_id)
        .await
        .unwrap()
        .unwrap()
        .id;
    let lookup = format!("/api/portfolios/publish?portfolioId={}", portfolio_id);

    // The id is correct but the portfolio is not published yet.
    let (status, _) = send(&app, "GET", &lookup, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/portfolios/publish",
        Some(json!({"userId": user_id, "portfolioData": builder_data("ignored")})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["portfolioId"], portfolio_id.to_string());

    let today = Utc::now().date_naive();
    sqlx::query("DELETE FROM portfolio_analytics WHERE user_id = $1 AND date = $2")
        .bind(user_id)
        .bind(today)
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(&app, "GET", &lookup, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["portfolio"]["id"], portfolio_id.to_string());

    let first = db::publish::views_on(&pool, user_id, today)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((first.portfolio_views, first.unique_visitors), (1, 1));

    send(&app, "GET", &lookup, None).await;
    let second = db::publish::views_on(&pool, user_id, today)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((second.portfolio_views, second.unique_visitors), (2, 1));
}

#[tokio::test]
async fn username_claimed_as_custom_subdomain_is_unavailable() {
    let Some(pool) = test_pool().await else { return };
    let app = app(&pool);
    let (owner_id, _) = signup(&app).await;
    let wanted = unique_username();

    let patch = PortfolioPatch {
        subdomain: Some(wanted.clone()),
        ..Default::default()
    };
    db::portfolios::upsert_for_user(&pool, owner_id, &patch, None)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({
            "email": format!("{}@example.com", wanted),
            "username": wanted,
            "full_name": "Late Comer",
            "password": "correct horse"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username is not available");
}
