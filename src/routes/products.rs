//! Public catalog endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Pagination, Product};
use crate::pricing::display_price;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:slug", get(product_by_slug))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
    category: Option<String>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    sort_by: Option<String>,
    sort_order: Option<String>,
    search: Option<String>,
    in_stock: Option<bool>,
    featured: Option<bool>,
}

/// Columns whitelisted for `sort_by`; anything else falls back to
/// creation time.
fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("base_price") => "p.base_price",
        Some("rating") => "p.rating",
        Some("name") => "p.name",
        _ => "p.created_at",
    }
}

/// Append the catalog filters shared by the listing and count queries.
fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, params: &'a ListParams) {
    builder.push(" WHERE p.is_active");
    if params.in_stock == Some(true) {
        builder.push(" AND p.is_in_stock");
    }
    if params.featured == Some(true) {
        builder.push(" AND p.is_featured");
    }
    if let Some(category) = &params.category {
        builder.push(" AND c.slug = ").push_bind(category);
    }
    if let Some(search) = &params.search {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = params.min_price {
        builder
            .push(" AND COALESCE(p.discount_price, p.base_price) >= ")
            .push_bind(min);
    }
    if let Some(max) = params.max_price {
        builder
            .push(" AND COALESCE(p.discount_price, p.base_price) <= ")
            .push_bind(max);
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct ProductSummary {
    id: Uuid,
    slug: String,
    name: String,
    brand: Option<String>,
    category_name: Option<String>,
    category_slug: Option<String>,
    price: Decimal,
    base_price: Decimal,
    discount_price: Option<Decimal>,
    rating: Decimal,
    is_featured: bool,
    in_stock: bool,
    image: Option<String>,
}

async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let order = if params.sort_order.as_deref() == Some("asc") {
        "ASC"
    } else {
        "DESC"
    };

    let mut query = QueryBuilder::new(
        "SELECT p.id, p.slug, p.name, p.brand, \
                c.name AS category_name, c.slug AS category_slug, \
                COALESCE(p.discount_price, p.base_price) AS price, \
                p.base_price, p.discount_price, p.rating, p.is_featured, \
                p.is_in_stock AS in_stock, \
                (SELECT i.image_url FROM product_images i \
                  WHERE i.product_id = p.id AND i.is_primary LIMIT 1) AS image \
         FROM products p \
         LEFT JOIN categories c ON c.id = p.category_id",
    );
    push_filters(&mut query, &params);
    query
        .push(" ORDER BY ")
        .push(sort_column(params.sort_by.as_deref()))
        .push(" ")
        .push(order)
        .push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind((page - 1) * limit);
    let products: Vec<ProductSummary> = query.build_query_as().fetch_all(&state.db).await?;

    let mut count = QueryBuilder::new(
        "SELECT COUNT(*) FROM products p LEFT JOIN categories c ON c.id = p.category_id",
    );
    push_filters(&mut count, &params);
    let total: i64 = count.build_query_scalar().fetch_one(&state.db).await?;

    Ok(Json(json!({
        "success": true,
        "data": products,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct ImageInfo {
    image_url: String,
    alt_text: Option<String>,
    is_primary: bool,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct VariantInfo {
    id: Uuid,
    sku: String,
    variant_name: String,
    attributes: serde_json::Value,
    price: Decimal,
    stock_quantity: i32,
    image_url: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct ReviewInfo {
    rating: i32,
    comment: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    first_name: String,
    last_name: String,
}

#[derive(Debug, Serialize)]
struct ProductDetail {
    #[serde(flatten)]
    product: Product,
    display_price: Decimal,
    images: Vec<ImageInfo>,
    variants: Vec<VariantInfo>,
    reviews: Vec<ReviewInfo>,
}

async fn product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let product: Product =
        sqlx::query_as("SELECT * FROM products WHERE slug = $1 AND is_active")
            .bind(&slug)
            .fetch_optional(&state.db)
            .await?
            .ok_or(ApiError::NotFound("Product"))?;

    let images: Vec<ImageInfo> = sqlx::query_as(
        "SELECT image_url, alt_text, is_primary FROM product_images \
         WHERE product_id = $1 ORDER BY sort_order",
    )
    .bind(product.id)
    .fetch_all(&state.db)
    .await?;

    let variants: Vec<VariantInfo> = sqlx::query_as(
        "SELECT id, sku, variant_name, attributes, price, stock_quantity, image_url \
         FROM product_variants WHERE product_id = $1 AND is_active",
    )
    .bind(product.id)
    .fetch_all(&state.db)
    .await?;

    let reviews: Vec<ReviewInfo> = sqlx::query_as(
        "SELECT r.rating, r.comment, r.created_at, u.first_name, u.last_name \
         FROM reviews r JOIN users u ON u.id = r.user_id \
         WHERE r.product_id = $1 AND r.is_approved \
         ORDER BY r.created_at DESC",
    )
    .bind(product.id)
    .fetch_all(&state.db)
    .await?;

    let detail = ProductDetail {
        display_price: display_price(product.base_price, product.discount_price),
        product,
        images,
        variants,
        reviews,
    };
    Ok(Json(json!({ "success": true, "data": detail })))
}
