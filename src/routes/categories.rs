//! Public category tree endpoints.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(category_tree))
        .route("/:slug", get(category_by_slug))
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
struct CategoryNode {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    image_url: Option<String>,
    sort_order: i32,
}

#[derive(Debug, Serialize)]
struct CategoryWithChildren {
    #[serde(flatten)]
    category: CategoryNode,
    children: Vec<CategoryNode>,
}

async fn category_tree(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let roots: Vec<CategoryNode> = sqlx::query_as(
        "SELECT id, name, slug, description, image_url, sort_order \
         FROM categories WHERE is_active AND parent_id IS NULL \
         ORDER BY sort_order",
    )
    .fetch_all(&state.db)
    .await?;

    let children: Vec<CategoryChildRow> = sqlx::query_as(
        "SELECT parent_id, id, name, slug, description, image_url, sort_order \
         FROM categories WHERE is_active AND parent_id IS NOT NULL \
         ORDER BY sort_order",
    )
    .fetch_all(&state.db)
    .await?;

    let mut by_parent: HashMap<Uuid, Vec<CategoryNode>> = HashMap::new();
    for child in children {
        by_parent
            .entry(child.parent_id)
            .or_default()
            .push(child.into_node());
    }

    let tree: Vec<CategoryWithChildren> = roots
        .into_iter()
        .map(|category| CategoryWithChildren {
            children: by_parent.remove(&category.id).unwrap_or_default(),
            category,
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": tree })))
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryChildRow {
    parent_id: Uuid,
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    image_url: Option<String>,
    sort_order: i32,
}

impl CategoryChildRow {
    fn into_node(self) -> CategoryNode {
        CategoryNode {
            id: self.id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            image_url: self.image_url,
            sort_order: self.sort_order,
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct CategoryProduct {
    id: Uuid,
    name: String,
    slug: String,
    base_price: Decimal,
    discount_price: Option<Decimal>,
    rating: Decimal,
    review_count: i32,
}

async fn category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let category: CategoryNode = sqlx::query_as(
        "SELECT id, name, slug, description, image_url, sort_order \
         FROM categories WHERE slug = $1 AND is_active",
    )
    .bind(&slug)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("Category"))?;

    let children: Vec<CategoryNode> = sqlx::query_as(
        "SELECT id, name, slug, description, image_url, sort_order \
         FROM categories WHERE parent_id = $1 AND is_active \
         ORDER BY sort_order",
    )
    .bind(category.id)
    .fetch_all(&state.db)
    .await?;

    let products: Vec<CategoryProduct> = sqlx::query_as(
        "SELECT id, name, slug, base_price, discount_price, rating, review_count \
         FROM products WHERE category_id = $1 AND is_active \
         ORDER BY created_at DESC LIMIT 20",
    )
    .bind(category.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "id": category.id,
            "name": category.name,
            "slug": category.slug,
            "description": category.description,
            "image_url": category.image_url,
            "sort_order": category.sort_order,
            "children": children,
            "products": products,
        },
    })))
}
