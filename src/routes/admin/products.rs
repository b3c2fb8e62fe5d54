//! Admin product management.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{Product, ProductVariant};
use crate::routes::admin::slugify;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", put(update_product).delete(delete_product))
        .route("/:id/status", patch(toggle_status))
}

#[derive(Debug, Serialize)]
struct AdminProduct {
    #[serde(flatten)]
    product: Product,
    category_name: Option<String>,
    category_slug: Option<String>,
    image: Option<String>,
    variants: Vec<ProductVariant>,
}

#[derive(Debug, sqlx::FromRow)]
struct AdminProductRow {
    #[sqlx(flatten)]
    product: Product,
    category_name: Option<String>,
    category_slug: Option<String>,
    image: Option<String>,
}

async fn list_products(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<serde_json::Value>> {
    let rows: Vec<AdminProductRow> = sqlx::query_as(
        "SELECT p.*, c.name AS category_name, c.slug AS category_slug, \
                (SELECT i.image_url FROM product_images i \
                  WHERE i.product_id = p.id AND i.is_primary LIMIT 1) AS image \
         FROM products p \
         LEFT JOIN categories c ON c.id = p.category_id \
         ORDER BY p.created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    let variants: Vec<ProductVariant> =
        sqlx::query_as("SELECT * FROM product_variants ORDER BY created_at")
            .fetch_all(&state.db)
            .await?;
    let mut by_product: HashMap<Uuid, Vec<ProductVariant>> = HashMap::new();
    for variant in variants {
        by_product.entry(variant.product_id).or_default().push(variant);
    }

    let data: Vec<AdminProduct> = rows
        .into_iter()
        .map(|row| AdminProduct {
            variants: by_product.remove(&row.product.id).unwrap_or_default(),
            category_name: row.category_name,
            category_slug: row.category_slug,
            image: row.image,
            product: row.product,
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Deserialize)]
struct NewVariant {
    sku: Option<String>,
    variant_name: String,
    #[serde(default)]
    attributes: serde_json::Value,
    price: Option<Decimal>,
    stock_quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct NewImage {
    url: String,
    alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateProductRequest {
    name: String,
    description: Option<String>,
    short_description: Option<String>,
    category_id: Option<Uuid>,
    brand: Option<String>,
    base_price: Decimal,
    weight: Option<Decimal>,
    dimensions: Option<String>,
    #[serde(default)]
    variants: Vec<NewVariant>,
    #[serde(default)]
    images: Vec<NewImage>,
}

async fn create_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let millis = Utc::now().timestamp_millis();
    let slug = format!("{}-{millis}", slugify(&req.name));
    let sku = format!("PROD-{millis}");

    let mut tx = state.db.begin().await?;

    let product: Product = sqlx::query_as(
        "INSERT INTO products (id, sku, slug, name, description, short_description, brand, \
                               category_id, base_price, weight, dimensions) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&sku)
    .bind(&slug)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.short_description)
    .bind(&req.brand)
    .bind(req.category_id)
    .bind(req.base_price)
    .bind(req.weight)
    .bind(&req.dimensions)
    .fetch_one(&mut *tx)
    .await?;

    for (index, variant) in req.variants.iter().enumerate() {
        let variant_sku = variant
            .sku
            .clone()
            .unwrap_or_else(|| format!("VAR-{millis}-{index}"));
        sqlx::query(
            "INSERT INTO product_variants (id, product_id, sku, variant_name, attributes, \
                                           price, stock_quantity) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::now_v7())
        .bind(product.id)
        .bind(&variant_sku)
        .bind(&variant.variant_name)
        .bind(&variant.attributes)
        .bind(variant.price.unwrap_or(req.base_price))
        .bind(variant.stock_quantity.unwrap_or(0))
        .execute(&mut *tx)
        .await?;
    }

    for (index, image) in req.images.iter().enumerate() {
        sqlx::query(
            "INSERT INTO product_images (id, product_id, image_url, alt_text, sort_order, \
                                         is_primary) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::now_v7())
        .bind(product.id)
        .bind(&image.url)
        .bind(image.alt_text.as_deref().unwrap_or(&req.name))
        .bind(index as i32)
        .bind(index == 0)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": product })),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateProductRequest {
    name: Option<String>,
    description: Option<String>,
    short_description: Option<String>,
    category_id: Option<Uuid>,
    brand: Option<String>,
    base_price: Option<Decimal>,
    discount_price: Option<Decimal>,
    weight: Option<Decimal>,
    dimensions: Option<String>,
    is_featured: Option<bool>,
    low_stock_threshold: Option<i32>,
}

async fn update_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let updated: Option<Product> = sqlx::query_as(
        "UPDATE products SET \
             name = COALESCE($2, name), \
             description = COALESCE($3, description), \
             short_description = COALESCE($4, short_description), \
             category_id = COALESCE($5, category_id), \
             brand = COALESCE($6, brand), \
             base_price = COALESCE($7, base_price), \
             discount_price = COALESCE($8, discount_price), \
             weight = COALESCE($9, weight), \
             dimensions = COALESCE($10, dimensions), \
             is_featured = COALESCE($11, is_featured), \
             low_stock_threshold = COALESCE($12, low_stock_threshold), \
             updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.short_description)
    .bind(req.category_id)
    .bind(&req.brand)
    .bind(req.base_price)
    .bind(req.discount_price)
    .bind(req.weight)
    .bind(&req.dimensions)
    .bind(req.is_featured)
    .bind(req.low_stock_threshold)
    .fetch_optional(&state.db)
    .await?;

    let product = updated.ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(json!({ "success": true, "data": product })))
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
    let product: Option<Product> = sqlx::query_as(
        "UPDATE products SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await?;

    let product = product.ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(json!({ "success": true, "data": product })))
}

/// Soft delete: products referenced by orders must stay queryable.
async fn delete_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let result =
        sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&state.db)
            .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Product"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Product deactivated",
    })))
}
