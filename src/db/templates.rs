//! Template catalog queries.

use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::models::{NewTemplate, Template};

const TEMPLATE_COLUMNS: &str = "id, name, description, category, preview_image, template_data, \
     is_premium, is_active, created_at";

#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub category: Option<String>,
    pub premium: bool,
    pub free: bool,
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &TemplateFilter) {
    query.push(" WHERE is_active = true");
    if let Some(category) = &filter.category {
        query.push(" AND category = ").push_bind(category.clone());
    }
    if filter.premium {
        query.push(" AND is_premium = true");
    } else if filter.free {
        query.push(" AND is_premium = false");
    }
}

/// Active templates, free ones first, then newest.
pub async fn list(
    pool: &PgPool,
    filter: &TemplateFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Template>, i64), sqlx::Error> {
    let mut query =
        QueryBuilder::<Postgres>::new(format!("SELECT {} FROM templates", TEMPLATE_COLUMNS));
    push_filters(&mut query, filter);
    query
        .push(" ORDER BY is_premium ASC, created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM templates");
    push_filters(&mut count, filter);

    let templates = query
        .build_query_as::<Template>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(normalize)
        .collect();
    let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

    Ok((templates, total))
}

pub async fn get_active(pool: &PgPool, id: &str) -> Result<Option<Template>, sqlx::Error> {
    let template = sqlx::query_as::<_, Template>(&format!(
        "SELECT {} FROM templates WHERE id = $1 AND is_active = true",
        TEMPLATE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(template.map(normalize))
}

pub async fn create(pool: &PgPool, new_template: &NewTemplate) -> Result<Template, sqlx::Error> {
    let template = sqlx::query_as::<_, Template>(&format!(
        r#"
        INSERT INTO templates (name, description, category, preview_image, template_data, is_premium)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        TEMPLATE_COLUMNS
    ))
    .bind(&new_template.name)
    .bind(&new_template.description)
    .bind(&new_template.category)
    .bind(&new_template.preview_image)
    .bind(&new_template.template_data)
    .bind(new_template.is_premium)
    .fetch_one(pool)
    .await?;

    tracing::info!(template_id = %template.id, name = %template.name, "template created");

    Ok(template)
}

fn normalize(mut template: Template) -> Template {
    template.template_data = normalize_template_data(template.template_data);
    template
}

/// Older rows hold the design payload as a JSON-encoded string. Parse those;
/// leave unparseable strings untouched.
pub fn normalize_template_data(data: Value) -> Value {
    match data {
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "template_data is not valid JSON, returning as-is");
                Value::String(raw)
            }
        },
        other => other,
    }
}
