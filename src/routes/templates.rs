/**
 * Template Routes
 * Catalog listing, lookup by id and admin creation
 */
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{
    self,
    models::{NewTemplate, Template},
    templates::TemplateFilter,
};
use crate::error::{AppError, AppResult};
use crate::routes::{json_body, present, query_params, Pagination};
use crate::state::AppState;
use crate::validation::page_bounds;

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub category: Option<String>,
    pub premium: Option<String>,
    pub free: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl TemplateQuery {
    fn filter(&self) -> TemplateFilter {
        TemplateFilter {
            category: present(self.category.clone()),
            premium: self.premium.as_deref() == Some("true"),
            free: self.free.as_deref() == Some("true"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub success: bool,
    pub templates: Vec<Template>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub success: bool,
    pub template: Template,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "previewImage")]
    pub preview_image: Option<String>,
    #[serde(default, alias = "templateData")]
    pub template_data: Option<Value>,
    #[serde(default, alias = "isPremium")]
    pub is_premium: bool,
}

impl CreateTemplateRequest {
    fn validate(self) -> AppResult<NewTemplate> {
        let name = present(self.name);
        let (name, template_data) = match (name, self.template_data) {
            (Some(name), Some(data)) if !data.is_null() => (name, data),
            _ => {
                return Err(AppError::invalid(
                    "Missing required fields: name, template_data",
                ))
            }
        };

        if !template_data.is_object() {
            return Err(AppError::invalid(
                "template_data must be a valid JSON object",
            ));
        }

        Ok(NewTemplate {
            name,
            description: self.description,
            category: self.category,
            preview_image: self.preview_image,
            template_data,
            is_premium: self.is_premium,
        })
    }
}

/// GET /api/templates?category=&premium=true&free=true&limit=&offset=
pub async fn list_templates(
    State(state): State<AppState>,
    query: Result<Query<TemplateQuery>, QueryRejection>,
) -> AppResult<Json<TemplateListResponse>> {
    let query = query_params(query)?;
    let (limit, offset) = page_bounds(query.limit.as_deref(), query.offset.as_deref());
    let pool = state.pool()?;

    let (templates, total) = db::templates::list(pool, &query.filter(), limit, offset).await?;

    Ok(Json(TemplateListResponse {
        success: true,
        templates,
        pagination: Pagination {
            limit,
            offset,
            total,
        },
    }))
}

/// GET /api/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<TemplateResponse>> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::invalid("Template ID is required"));
    }

    let pool = state.pool()?;
    let template = db::templates::get_active(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Template not found"))?;

    Ok(Json(TemplateResponse {
        success: true,
        template,
        message: None,
    }))
}

/// POST /api/templates
pub async fn create_template(
    State(state): State<AppState>,
    payload: Result<Json<CreateTemplateRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<TemplateResponse>)> {
    let new_template = json_body(payload)?.validate()?;
    let pool = state.pool()?;

    let template = db::templates::create(pool, &new_template).await?;

    Ok((
        StatusCode::CREATED,
        Json(TemplateResponse {
            success: true,
            template,
            message: Some("Template created successfully".to_string()),
        }),
    ))
}
