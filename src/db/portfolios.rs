//! Portfolio persistence: one portfolio per user, partial updates and
//! whole-set section replacement.

use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{NewPortfolioSection, Portfolio, PortfolioWithOwner};
use super::users::username_of;
use crate::error::{AppError, AppResult};
use crate::validation::validate_subdomain;

pub const DEFAULT_TITLE: &str = "My Portfolio";
pub const DEFAULT_SUBTITLE: &str = "Content Creator";
pub const DEFAULT_TEMPLATE: &str = "minimal";

pub(crate) const PORTFOLIO_COLUMNS: &str = "id, user_id, title, subtitle, template_id, \
     theme_settings, is_published, subdomain, meta_title, meta_description, custom_css, \
     favicon_url, created_at, updated_at";

/// Fields a save may change. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortfolioPatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(alias = "templateId")]
    pub template_id: Option<String>,
    pub theme_settings: Option<Value>,
    pub is_published: Option<bool>,
    pub subdomain: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub custom_css: Option<String>,
    pub favicon_url: Option<String>,
}

impl PortfolioPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.subtitle.is_none()
            && self.template_id.is_none()
            && self.theme_settings.is_none()
            && self.is_published.is_none()
            && self.subdomain.is_none()
            && self.meta_title.is_none()
            && self.meta_description.is_none()
            && self.custom_css.is_none()
            && self.favicon_url.is_none()
    }

    /// Fold the builder payload in: its title/subtitle/bio fill gaps and the
    /// whole blob becomes the theme settings.
    pub fn merge_builder_data(&mut self, data: &PortfolioData, raw: &Value) {
        if self.title.is_none() {
            self.title = non_empty(data.title.as_deref());
        }
        if self.subtitle.is_none() {
            self.subtitle = non_empty(data.subtitle.as_deref());
        }
        if self.meta_description.is_none() {
            self.meta_description = non_empty(data.bio.as_deref());
        }
        self.theme_settings = Some(raw.clone());
    }
}

/// The typed view of the builder's `portfolioData` blob
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortfolioData {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub bio: Option<String>,
    pub sections: Option<Vec<SectionInput>>,
}

impl PortfolioData {
    pub fn from_value(value: &Value) -> AppResult<Self> {
        if !value.is_object() {
            return Err(AppError::invalid("portfolioData must be a JSON object"));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| AppError::invalid(format!("Invalid portfolioData: {}", e)))
    }
}

/// One section as sent by the builder
#[derive(Debug, Clone, Deserialize)]
pub struct SectionInput {
    #[serde(rename = "type", alias = "section_type")]
    pub section_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub data: Option<Value>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

/// Displayable text of a section: `content`, then `description`, then "".
pub fn section_content(data: Option<&Value>) -> String {
    let field = |key: &str| data.and_then(|d| d.get(key)).and_then(Value::as_str);
    non_empty(field("content"))
        .or_else(|| non_empty(field("description")))
        .unwrap_or_default()
}

/// Enabled sections only, ordered by their position among the kept entries.
pub fn build_sections(inputs: &[SectionInput]) -> Vec<NewPortfolioSection> {
    inputs
        .iter()
        .filter(|s| s.enabled)
        .zip(0..)
        .map(|(s, sort_order)| NewPortfolioSection {
            section_type: s.section_type.clone(),
            title: non_empty(s.title.as_deref()).unwrap_or_else(|| s.section_type.clone()),
            content: section_content(s.data.as_ref()),
            media_urls: serde_json::json!([]),
            settings: s.data.clone().unwrap_or_else(|| serde_json::json!({})),
            sort_order,
            is_visible: true,
        })
        .collect()
}

/// Result of a portfolio save
#[derive(Debug, Clone)]
pub struct SavedPortfolio {
    pub id: Uuid,
    pub subdomain: String,
}

/// Listing filters for GET /api/portfolios
#[derive(Debug, Clone, Default)]
pub struct PortfolioFilter {
    pub user_id: Option<Uuid>,
    pub subdomain: Option<String>,
    pub published_only: bool,
}

pub(crate) async fn insert_sections(
    conn: &mut PgConnection,
    portfolio_id: Uuid,
    sections: &[NewPortfolioSection],
) -> Result<(), sqlx::Error> {
    if sections.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO portfolio_sections \
         (portfolio_id, section_type, title, content, media_urls, settings, sort_order, is_visible) ",
    );
    query.push_values(sections, |mut row, section| {
        row.push_bind(portfolio_id)
            .push_bind(section.section_type.clone())
            .push_bind(section.title.clone())
            .push_bind(section.content.clone())
            .push_bind(section.media_urls.clone())
            .push_bind(section.settings.clone())
            .push_bind(section.sort_order)
            .push_bind(section.is_visible);
    });
    query.build().execute(conn).await?;

    Ok(())
}

/// Delete every section of the portfolio and insert the new set. Callers run
/// this inside a transaction so readers never see the empty gap.
pub(crate) async fn replace_sections(
    conn: &mut PgConnection,
    portfolio_id: Uuid,
    sections: &[NewPortfolioSection],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM portfolio_sections WHERE portfolio_id = $1")
        .bind(portfolio_id)
        .execute(&mut *conn)
        .await?;

    insert_sections(conn, portfolio_id, sections).await
}

/// Reject a subdomain held by a portfolio other than the caller's.
async fn ensure_subdomain_free(
    conn: &mut PgConnection,
    subdomain: &str,
    owner: OwnerKey,
) -> AppResult<()> {
    let taken: Option<(Uuid,)> = match owner {
        OwnerKey::User(user_id) => {
            sqlx::query_as("SELECT id FROM portfolios WHERE subdomain = $1 AND user_id <> $2")
                .bind(subdomain)
                .bind(user_id)
                .fetch_optional(conn)
                .await?
        }
        OwnerKey::Portfolio(id) => {
            sqlx::query_as("SELECT id FROM portfolios WHERE subdomain = $1 AND id <> $2")
                .bind(subdomain)
                .bind(id)
                .fetch_optional(conn)
                .await?
        }
    };

    match taken {
        Some(_) => Err(AppError::conflict("Subdomain already taken")),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy)]
enum OwnerKey {
    User(Uuid),
    Portfolio(Uuid),
}

/// Create the user's portfolio or update it in place.
///
/// `UNIQUE(user_id)` plus `ON CONFLICT` makes the create-or-update atomic, so
/// two concurrent first saves end up with one row. Insert defaults apply only
/// when a field is absent; on update an absent field keeps its value.
pub async fn upsert_for_user(
    pool: &PgPool,
    user_id: Uuid,
    patch: &PortfolioPatch,
    sections: Option<&[NewPortfolioSection]>,
) -> AppResult<SavedPortfolio> {
    if let Some(subdomain) = &patch.subdomain {
        validate_subdomain(subdomain)?;
    }

    let mut tx = pool.begin().await?;

    let username = username_of(&mut *tx, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if let Some(subdomain) = &patch.subdomain {
        ensure_subdomain_free(&mut tx, subdomain, OwnerKey::User(user_id)).await?;
    }

    let (id, subdomain): (Uuid, String) = sqlx::query_as(
        r#"
        INSERT INTO portfolios (
            user_id, title, subtitle, template_id, theme_settings, is_published,
            subdomain, meta_title, meta_description, custom_css, favicon_url
        )
        VALUES (
            $1, COALESCE($2, $13), COALESCE($3, $14), COALESCE($4, $15),
            COALESCE($5, '{}'::jsonb), COALESCE($6, false), COALESCE($7, $12),
            COALESCE($8, $2, $13), COALESCE($9, 'Creator Portfolio'), $10, $11
        )
        ON CONFLICT (user_id) DO UPDATE SET
            title = COALESCE($2, portfolios.title),
            subtitle = COALESCE($3, portfolios.subtitle),
            template_id = COALESCE($4, portfolios.template_id),
            theme_settings = COALESCE($5, portfolios.theme_settings),
            is_published = COALESCE($6, portfolios.is_published),
            subdomain = COALESCE($7, portfolios.subdomain),
            meta_title = COALESCE($8, portfolios.meta_title),
            meta_description = COALESCE($9, portfolios.meta_description),
            custom_css = COALESCE($10, portfolios.custom_css),
            favicon_url = COALESCE($11, portfolios.favicon_url),
            updated_at = now()
        RETURNING id, subdomain
        "#,
    )
    .bind(user_id)
    .bind(&patch.title)
    .bind(&patch.subtitle)
    .bind(&patch.template_id)
    .bind(&patch.theme_settings)
    .bind(patch.is_published)
    .bind(&patch.subdomain)
    .bind(&patch.meta_title)
    .bind(&patch.meta_description)
    .bind(&patch.custom_css)
    .bind(&patch.favicon_url)
    .bind(&username)
    .bind(DEFAULT_TITLE)
    .bind(DEFAULT_SUBTITLE)
    .bind(DEFAULT_TEMPLATE)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(sections) = sections {
        replace_sections(&mut tx, id, sections).await?;
    }

    tx.commit().await?;

    tracing::info!(
        portfolio_id = %id,
        user_id = %user_id,
        sections = ?sections.map(|s| s.len()),
        "portfolio saved"
    );

    Ok(SavedPortfolio { id, subdomain })
}

/// `UPDATE portfolios SET <present fields>, updated_at = now() WHERE id = ...`
///
/// Column names come from this fixed list; every value is bound.
fn patch_query(id: Uuid, patch: &PortfolioPatch) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new("UPDATE portfolios SET ");
    let mut set = query.separated(", ");

    if let Some(v) = &patch.title {
        set.push("title = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &patch.subtitle {
        set.push("subtitle = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &patch.template_id {
        set.push("template_id = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &patch.custom_css {
        set.push("custom_css = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &patch.theme_settings {
        set.push("theme_settings = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = patch.is_published {
        set.push("is_published = ").push_bind_unseparated(v);
    }
    if let Some(v) = &patch.subdomain {
        set.push("subdomain = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &patch.meta_title {
        set.push("meta_title = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &patch.meta_description {
        set.push("meta_description = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &patch.favicon_url {
        set.push("favicon_url = ").push_bind_unseparated(v.clone());
    }
    set.push("updated_at = now()");

    query
        .push(" WHERE id = ")
        .push_bind(id)
        .push(" RETURNING ")
        .push(PORTFOLIO_COLUMNS);

    query
}

/// Apply a partial update to a portfolio by id, optionally replacing its
/// sections in the same transaction.
pub async fn patch_by_id(
    pool: &PgPool,
    id: Uuid,
    patch: &PortfolioPatch,
    sections: Option<&[NewPortfolioSection]>,
) -> AppResult<Portfolio> {
    if patch.is_empty() && sections.is_none() {
        return Err(AppError::invalid("No fields to update"));
    }
    if let Some(subdomain) = &patch.subdomain {
        validate_subdomain(subdomain)?;
    }

    let mut tx = pool.begin().await?;

    if let Some(subdomain) = &patch.subdomain {
        ensure_subdomain_free(&mut tx, subdomain, OwnerKey::Portfolio(id)).await?;
    }

    let portfolio = patch_query(id, patch)
        .build_query_as::<Portfolio>()
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Portfolio not found"))?;

    if let Some(sections) = sections {
        replace_sections(&mut tx, id, sections).await?;
    }

    tx.commit().await?;

    tracing::info!(portfolio_id = %id, "portfolio updated");

    Ok(portfolio)
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &PortfolioFilter) {
    query.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        query.push(" AND p.user_id = ").push_bind(user_id);
    }
    if let Some(subdomain) = &filter.subdomain {
        query.push(" AND p.subdomain = ").push_bind(subdomain.clone());
    }
    if filter.published_only {
        query.push(" AND p.is_published = true");
    }
}

/// Portfolios joined with their owners, most recently updated first, plus the
/// total number of matches.
pub async fn list(
    pool: &PgPool,
    filter: &PortfolioFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PortfolioWithOwner>, i64), sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new(
        r#"
        SELECT p.id, p.user_id, p.title, p.subtitle, p.template_id, p.theme_settings,
               p.is_published, p.subdomain, p.meta_title, p.meta_description, p.custom_css,
               p.favicon_url, p.created_at, p.updated_at,
               u.username, u.full_name, u.profile_image, u.bio
        FROM portfolios p
        JOIN users u ON p.user_id = u.id"#,
    );
    push_filters(&mut query, filter);
    query
        .push(" ORDER BY p.updated_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM portfolios p");
    push_filters(&mut count, filter);

    let portfolios = query
        .build_query_as::<PortfolioWithOwner>()
        .fetch_all(pool)
        .await?;
    let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

    Ok((portfolios, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sections_from(value: Value) -> Vec<SectionInput> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_section_content_fallbacks() {
        assert_eq!(section_content(Some(&json!({"content": "c", "description": "d"}))), "c");
        assert_eq!(section_content(Some(&json!({"content": "", "description": "d"}))), "d");
        assert_eq!(section_content(Some(&json!({"description": "d"}))), "d");
        assert_eq!(section_content(Some(&json!({"other": 1}))), "");
        assert_eq!(section_content(None), "");
    }

    #[test]
    fn test_build_sections_filters_disabled_and_orders_by_position() {
        let inputs = sections_from(json!([
            {"type": "hero", "enabled": true, "title": "Hello", "data": {"content": "hi"}},
            {"type": "about", "enabled": false, "data": {"content": "skip me"}},
            {"type": "gallery", "data": {"description": "no enabled flag"}},
            {"type": "contact", "enabled": true, "data": {"description": "write me"}}
        ]));

        let built = build_sections(&inputs);
        assert_eq!(built.len(), 2);

        assert_eq!(built[0].section_type, "hero");
        assert_eq!(built[0].title, "Hello");
        assert_eq!(built[0].content, "hi");
        assert_eq!(built[0].sort_order, 0);

        assert_eq!(built[1].section_type, "contact");
        assert_eq!(built[1].title, "contact");
        assert_eq!(built[1].content, "write me");
        assert_eq!(built[1].sort_order, 1);
        assert_eq!(built[1].settings, json!({"description": "write me"}));
        assert_eq!(built[1].media_urls, json!([]));
        assert!(built.iter().all(|s| s.is_visible));
    }

    #[test]
    fn test_build_sections_is_deterministic() {
        let inputs = sections_from(json!([
            {"type": "hero", "enabled": true, "data": {"content": "a"}},
            {"type": "about", "enabled": true}
        ]));
        assert_eq!(build_sections(&inputs), build_sections(&inputs));
        assert_eq!(build_sections(&inputs)[1].settings, json!({}));
    }

    #[test]
    fn test_portfolio_data_requires_object() {
        assert!(PortfolioData::from_value(&json!([1, 2])).is_err());
        let data = PortfolioData::from_value(&json!({
            "title": "T",
            "bio": "B",
            "sections": [{"type": "hero", "enabled": true}],
            "colors": {"primary": "#000"}
        }))
        .unwrap();
        assert_eq!(data.title.as_deref(), Some("T"));
        assert_eq!(data.sections.unwrap().len(), 1);
    }

    #[test]
    fn test_merge_builder_data_prefers_explicit_fields() {
        let raw = json!({"title": "From builder", "subtitle": "", "bio": "Bio text"});
        let data = PortfolioData::from_value(&raw).unwrap();

        let mut patch = PortfolioPatch {
            title: Some("Explicit".to_string()),
            ..Default::default()
        };
        patch.merge_builder_data(&data, &raw);

        assert_eq!(patch.title.as_deref(), Some("Explicit"));
        assert_eq!(patch.subtitle, None);
        assert_eq!(patch.meta_description.as_deref(), Some("Bio text"));
        assert_eq!(patch.theme_settings, Some(raw));
    }

    #[test]
    fn test_patch_query_only_sets_present_fields() {
        let id = Uuid::new_v4();
        let patch = PortfolioPatch {
            title: Some("New".to_string()),
            is_published: Some(true),
            ..Default::default()
        };
        let query = patch_query(id, &patch);
        let sql = query.sql();

        assert!(sql.starts_with(
            "UPDATE portfolios SET title = $1, is_published = $2, updated_at = now() WHERE id = $3"
        ));
        assert!(!sql.contains("subtitle ="));
        assert!(sql.contains("RETURNING id, user_id"));
    }

    #[test]
    fn test_empty_patch_detection() {
        assert!(PortfolioPatch::default().is_empty());
        let patch = PortfolioPatch {
            favicon_url: Some("https://x/icon.png".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
