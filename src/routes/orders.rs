//! Customer order endpoints: placement and history.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::checkout::{self, NewOrder};
use crate::error::{ApiError, ApiResult};
use crate::events;
use crate::models::{Order, UserAddress};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order).get(my_orders))
        .route("/:id", get(order_by_id))
}

#[derive(Debug, Deserialize)]
struct PlaceOrderRequest {
    shipping_address_id: Option<Uuid>,
    billing_address_id: Option<Uuid>,
    payment_method: Option<String>,
    notes: Option<String>,
}

async fn place_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let (Some(shipping_address_id), Some(billing_address_id)) =
        (req.shipping_address_id, req.billing_address_id)
    else {
        return Err(ApiError::BadRequest(
            "Shipping and billing address required".to_string(),
        ));
    };

    let order = checkout::place_order(
        &state.db,
        user.id,
        NewOrder {
            shipping_address_id,
            billing_address_id,
            payment_method: req.payment_method.unwrap_or_else(|| "COD".to_string()),
            notes: req.notes,
        },
    )
    .await?;

    events::publish_order_placed(state.nats.as_ref(), &order).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Order placed successfully",
            "data": order,
        })),
    ))
}

/// One order line joined with its product and variant names, as shown
/// in order history.
#[derive(Debug, Serialize, sqlx::FromRow)]
struct OrderItemDetail {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
    price: Decimal,
    total: Decimal,
    product_name: String,
    product_slug: String,
    variant_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct OrderDetail {
    #[serde(flatten)]
    order: Order,
    items: Vec<OrderItemDetail>,
}

async fn items_for_orders(
    db: &sqlx::PgPool,
    order_ids: &[Uuid],
) -> Result<Vec<OrderItemDetail>, ApiError> {
    let items: Vec<OrderItemDetail> = sqlx::query_as(
        "SELECT oi.id, oi.order_id, oi.product_id, oi.variant_id, oi.quantity, oi.price, oi.total, \
                p.name AS product_name, p.slug AS product_slug, v.variant_name \
         FROM order_items oi \
         JOIN products p ON p.id = oi.product_id \
         LEFT JOIN product_variants v ON v.id = oi.variant_id \
         WHERE oi.order_id = ANY($1)",
    )
    .bind(order_ids)
    .fetch_all(db)
    .await?;
    Ok(items)
}

async fn my_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.id)
            .fetch_all(&state.db)
            .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut by_order: HashMap<Uuid, Vec<OrderItemDetail>> = HashMap::new();
    for item in items_for_orders(&state.db, &order_ids).await? {
        by_order.entry(item.order_id).or_default().push(item);
    }

    let data: Vec<OrderDetail> = orders
        .into_iter()
        .map(|order| OrderDetail {
            items: by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Serialize)]
struct OrderWithAddresses {
    #[serde(flatten)]
    order: Order,
    items: Vec<OrderItemDetail>,
    shipping_address: Option<UserAddress>,
    billing_address: Option<UserAddress>,
}

async fn order_by_id(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Order"))?;

    let items = items_for_orders(&state.db, &[order.id]).await?;

    let shipping_address: Option<UserAddress> =
        sqlx::query_as("SELECT * FROM user_addresses WHERE id = $1")
            .bind(order.shipping_address_id)
            .fetch_optional(&state.db)
            .await?;
    let billing_address: Option<UserAddress> =
        sqlx::query_as("SELECT * FROM user_addresses WHERE id = $1")
            .bind(order.billing_address_id)
            .fetch_optional(&state.db)
            .await?;

    let detail = OrderWithAddresses {
        order,
        items,
        shipping_address,
        billing_address,
    };
    Ok(Json(json!({ "success": true, "data": detail })))
}
