//! Inventory monitoring and stock adjustments.

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::models::ProductVariant;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory))
        .route("/low-stock", get(low_stock))
        .route("/:variant_id", patch(update_stock))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct InventoryRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    variant: ProductVariant,
    product_name: String,
    product_slug: String,
    low_stock_threshold: i32,
    is_low_stock: bool,
}

async fn list_inventory(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<serde_json::Value>> {
    let rows: Vec<InventoryRow> = sqlx::query_as(
        "SELECT v.*, p.name AS product_name, p.slug AS product_slug, \
                p.low_stock_threshold, \
                v.stock_quantity <= p.low_stock_threshold AS is_low_stock \
         FROM product_variants v \
         JOIN products p ON p.id = v.product_id \
         ORDER BY p.name, v.variant_name",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": rows })))
}

async fn low_stock(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<serde_json::Value>> {
    let rows: Vec<InventoryRow> = sqlx::query_as(
        "SELECT v.*, p.name AS product_name, p.slug AS product_slug, \
                p.low_stock_threshold, TRUE AS is_low_stock \
         FROM product_variants v \
         JOIN products p ON p.id = v.product_id \
         WHERE v.stock_quantity <= p.low_stock_threshold \
         ORDER BY v.stock_quantity",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": rows })))
}

#[derive(Debug, Deserialize)]
struct UpdateStockRequest {
    stock_quantity: Option<i32>,
}

async fn update_stock(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(variant_id): Path<Uuid>,
    Json(req): Json<UpdateStockRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let quantity = match req.stock_quantity {
        Some(q) if q >= 0 => q,
        _ => {
            return Err(ApiError::BadRequest(
                "Valid stock_quantity is required".to_string(),
            ))
        }
    };

    let variant: Option<ProductVariant> = sqlx::query_as(
        "UPDATE product_variants SET stock_quantity = $2 WHERE id = $1 RETURNING *",
    )
    .bind(variant_id)
    .bind(quantity)
    .fetch_optional(&state.db)
    .await?;

    let variant = variant.ok_or(ApiError::NotFound("Variant"))?;
    Ok(Json(json!({ "success": true, "data": variant })))
}
