//! Admin category management.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::models::Category;
use crate::routes::admin::slugify;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", put(update_category).delete(delete_category))
        .route("/:id/status", patch(toggle_status))
}

#[derive(Debug, Serialize)]
struct AdminCategory {
    #[serde(flatten)]
    category: Category,
    parent_name: Option<String>,
    children: Vec<Category>,
}

#[derive(Debug, sqlx::FromRow)]
struct AdminCategoryRow {
    #[sqlx(flatten)]
    category: Category,
    parent_name: Option<String>,
}

async fn list_categories(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<serde_json::Value>> {
    let rows: Vec<AdminCategoryRow> = sqlx::query_as(
        "SELECT c.*, parent.name AS parent_name \
         FROM categories c \
         LEFT JOIN categories parent ON parent.id = c.parent_id \
         ORDER BY c.sort_order",
    )
    .fetch_all(&state.db)
    .await?;

    let mut by_parent: HashMap<Uuid, Vec<Category>> = HashMap::new();
    for row in &rows {
        if let Some(parent_id) = row.category.parent_id {
            by_parent
                .entry(parent_id)
                .or_default()
                .push(row.category.clone());
        }
    }

    let data: Vec<AdminCategory> = rows
        .into_iter()
        .map(|row| AdminCategory {
            children: by_parent.remove(&row.category.id).unwrap_or_default(),
            parent_name: row.parent_name,
            category: row.category,
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Deserialize)]
struct CreateCategoryRequest {
    name: String,
    description: Option<String>,
    parent_id: Option<Uuid>,
    image_url: Option<String>,
    #[serde(default)]
    sort_order: i32,
}

async fn create_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Category name is required".to_string()));
    }

    let category: Category = sqlx::query_as(
        "INSERT INTO categories (id, name, slug, description, parent_id, image_url, sort_order) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(slugify(&req.name))
    .bind(&req.description)
    .bind(req.parent_id)
    .bind(&req.image_url)
    .bind(req.sort_order)
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": category })),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateCategoryRequest {
    name: Option<String>,
    description: Option<String>,
    parent_id: Option<Uuid>,
    image_url: Option<String>,
    sort_order: Option<i32>,
}

async fn update_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    // Renaming re-derives the slug, like creation does.
    let slug = req.name.as_deref().map(slugify);

    let updated: Option<Category> = sqlx::query_as(
        "UPDATE categories SET \
             name = COALESCE($2, name), \
             slug = COALESCE($3, slug), \
             description = COALESCE($4, description), \
             parent_id = COALESCE($5, parent_id), \
             image_url = COALESCE($6, image_url), \
             sort_order = COALESCE($7, sort_order) \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&slug)
    .bind(&req.description)
    .bind(req.parent_id)
    .bind(&req.image_url)
    .bind(req.sort_order)
    .fetch_optional(&state.db)
    .await?;

    let category = updated.ok_or(ApiError::NotFound("Category"))?;
    Ok(Json(json!({ "success": true, "data": category })))
}

#[derive(Debug, Deserialize)]
struct ToggleStatusRequest {
    is_active: bool,
}

async fn toggle_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleStatusRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let category: Option<Category> = sqlx::query_as(
        "UPDATE categories SET is_active = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await?;

    let category = category.ok_or(ApiError::NotFound("Category"))?;
    Ok(Json(json!({ "success": true, "data": category })))
}

async fn delete_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let result = sqlx::query("UPDATE categories SET is_active = FALSE WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Category"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Category deactivated",
    })))
}
