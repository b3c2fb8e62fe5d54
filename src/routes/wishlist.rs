//! Wishlist endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_wishlist)).route(
        "/:product_id",
        post(add_to_wishlist).delete(remove_from_wishlist),
    )
}

#[derive(Debug, sqlx::FromRow)]
struct WishlistRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    product_id: Uuid,
    name: String,
    slug: String,
    price: Decimal,
    rating: Decimal,
    image: Option<String>,
}

#[derive(Debug, Serialize)]
struct WishlistView {
    id: Uuid,
    product: serde_json::Value,
    added_at: DateTime<Utc>,
}

async fn get_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let rows: Vec<WishlistRow> = sqlx::query_as(
        "SELECT w.id, w.created_at, \
                p.id AS product_id, p.name, p.slug, \
                COALESCE(p.discount_price, p.base_price) AS price, p.rating, \
                (SELECT i.image_url FROM product_images i \
                  WHERE i.product_id = p.id AND i.is_primary LIMIT 1) AS image \
         FROM wishlist_items w \
         JOIN products p ON p.id = w.product_id \
         WHERE w.user_id = $1 \
         ORDER BY w.created_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<WishlistView> = rows
        .into_iter()
        .map(|row| WishlistView {
            id: row.id,
            product: json!({
                "id": row.product_id,
                "name": row.name,
                "slug": row.slug,
                "price": row.price,
                "image": row.image,
                "rating": row.rating,
            }),
            added_at: row.created_at,
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

async fn add_to_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let product: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active")
            .bind(product_id)
            .fetch_optional(&state.db)
            .await?;
    if product.is_none() {
        return Err(ApiError::NotFound("Product"));
    }

    let inserted = sqlx::query(
        "INSERT INTO wishlist_items (id, user_id, product_id) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, product_id) DO NOTHING",
    )
    .bind(Uuid::now_v7())
    .bind(user.id)
    .bind(product_id)
    .execute(&state.db)
    .await?;

    if inserted.rows_affected() == 0 {
        return Ok((
            StatusCode::OK,
            Json(json!({ "success": true, "message": "Already in wishlist" })),
        ));
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Added to wishlist" })),
    ))
}

async fn remove_from_wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(user.id)
        .bind(product_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Removed from wishlist",
    })))
}
