//! Cart endpoints. All operations are scoped to the authenticated user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::pricing::PriceSources;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_to_cart))
        .route("/:id", put(update_cart_item).delete(remove_cart_item))
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    quantity: i32,
    product_id: Uuid,
    product_name: String,
    product_slug: String,
    base_price: Decimal,
    discount_price: Option<Decimal>,
    image: Option<String>,
    variant_id: Option<Uuid>,
    variant_name: Option<String>,
    variant_price: Option<Decimal>,
    stock_quantity: Option<i32>,
    variant_image: Option<String>,
}

#[derive(Debug, Serialize)]
struct CartLineView {
    id: Uuid,
    quantity: i32,
    price: Decimal,
    subtotal: Decimal,
    product: serde_json::Value,
    variant: Option<serde_json::Value>,
}

async fn get_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let rows: Vec<CartLineRow> = sqlx::query_as(
        "SELECT ci.id, ci.quantity, \
                p.id AS product_id, p.name AS product_name, p.slug AS product_slug, \
                p.base_price, p.discount_price, \
                (SELECT i.image_url FROM product_images i \
                  WHERE i.product_id = p.id AND i.is_primary LIMIT 1) AS image, \
                v.id AS variant_id, v.variant_name, v.price AS variant_price, \
                v.stock_quantity, v.image_url AS variant_image \
         FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id \
         LEFT JOIN product_variants v ON v.id = ci.variant_id \
         WHERE ci.user_id = $1 \
         ORDER BY ci.created_at",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    let items: Vec<CartLineView> = rows
        .into_iter()
        .map(|row| {
            let price = PriceSources {
                base_price: row.base_price,
                discount_price: row.discount_price,
                variant_price: row.variant_price,
            }
            .resolve();
            CartLineView {
                id: row.id,
                quantity: row.quantity,
                price,
                subtotal: price * Decimal::from(row.quantity),
                product: json!({
                    "id": row.product_id,
                    "name": row.product_name,
                    "slug": row.product_slug,
                    "image": row.image,
                }),
                variant: row.variant_id.map(|id| {
                    json!({
                        "id": id,
                        "variant_name": row.variant_name,
                        "price": row.variant_price,
                        "stock_quantity": row.stock_quantity,
                        "image_url": row.variant_image,
                    })
                }),
            }
        })
        .collect();

    let total: Decimal = items.iter().map(|i| i.subtotal).sum();
    Ok(Json(json!({
        "success": true,
        "data": { "items": items, "total": total },
    })))
}

#[derive(Debug, Deserialize)]
struct AddToCartRequest {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    #[serde(default = "default_quantity")]
    quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<AddToCartRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if req.quantity < 1 {
        return Err(ApiError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let product: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active")
            .bind(req.product_id)
            .fetch_optional(&state.db)
            .await?;
    if product.is_none() {
        return Err(ApiError::NotFound("Product"));
    }

    let mut stock_quantity: Option<i32> = None;
    if let Some(variant_id) = req.variant_id {
        let variant: Option<(i32,)> = sqlx::query_as(
            "SELECT stock_quantity FROM product_variants \
             WHERE id = $1 AND product_id = $2 AND is_active",
        )
        .bind(variant_id)
        .bind(req.product_id)
        .fetch_optional(&state.db)
        .await?;
        let (stock,) = variant.ok_or(ApiError::NotFound("Variant"))?;
        if stock < req.quantity {
            return Err(ApiError::BadRequest("Insufficient stock".to_string()));
        }
        stock_quantity = Some(stock);
    }

    let existing: Option<(Uuid, i32)> = sqlx::query_as(
        "SELECT id, quantity FROM cart_items \
         WHERE user_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3",
    )
    .bind(user.id)
    .bind(req.product_id)
    .bind(req.variant_id)
    .fetch_optional(&state.db)
    .await?;

    match existing {
        Some((id, quantity)) => {
            let new_quantity = quantity + req.quantity;
            if let Some(stock) = stock_quantity {
                if new_quantity > stock {
                    return Err(ApiError::BadRequest("Insufficient stock".to_string()));
                }
            }
            sqlx::query("UPDATE cart_items SET quantity = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(new_quantity)
                .execute(&state.db)
                .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO cart_items (id, user_id, product_id, variant_id, quantity) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::now_v7())
            .bind(user.id)
            .bind(req.product_id)
            .bind(req.variant_id)
            .bind(req.quantity)
            .execute(&state.db)
            .await?;
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Item added to cart" })),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateCartItemRequest {
    quantity: i32,
}

async fn update_cart_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCartItemRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.quantity < 1 {
        return Err(ApiError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let item: Option<(Uuid, Option<i32>)> = sqlx::query_as(
        "SELECT ci.id, v.stock_quantity \
         FROM cart_items ci \
         LEFT JOIN product_variants v ON v.id = ci.variant_id \
         WHERE ci.id = $1 AND ci.user_id = $2",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?;
    let (item_id, stock) = item.ok_or(ApiError::NotFound("Cart item"))?;

    if let Some(stock) = stock {
        if req.quantity > stock {
            return Err(ApiError::BadRequest("Insufficient stock".to_string()));
        }
    }

    sqlx::query("UPDATE cart_items SET quantity = $2, updated_at = NOW() WHERE id = $1")
        .bind(item_id)
        .bind(req.quantity)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "success": true, "message": "Cart updated" })))
}

async fn remove_cart_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Item removed from cart",
    })))
}
