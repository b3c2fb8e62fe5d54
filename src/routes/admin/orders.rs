//! Admin order management: listing, detail and status transitions.

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{Order, Pagination, UserAddress};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(order_by_id))
        .route("/:id/status", patch(update_status))
}

const STATUSES: &[&str] = &["pending", "processing", "shipped", "delivered", "cancelled"];

/// Lifecycle: pending → processing → shipped → delivered, with
/// cancellation allowed from any non-terminal state.
fn is_valid_transition(from: &str, to: &str) -> bool {
    match (from, to) {
        ("pending", "processing")
        | ("processing", "shipped")
        | ("shipped", "delivered") => true,
        (from, "cancelled") => from != "delivered" && from != "cancelled",
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<String>,
    user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct AdminOrderRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    order: Order,
    email: String,
    first_name: String,
    last_name: String,
}

async fn list_orders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let orders: Vec<AdminOrderRow> = sqlx::query_as(
        "SELECT o.*, u.email, u.first_name, u.last_name \
         FROM orders o \
         JOIN users u ON u.id = o.user_id \
         WHERE ($1::text IS NULL OR o.status = $1) \
           AND ($2::uuid IS NULL OR o.user_id = $2) \
         ORDER BY o.created_at DESC \
         LIMIT $3 OFFSET $4",
    )
    .bind(&params.status)
    .bind(params.user_id)
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(&state.db)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders o \
         WHERE ($1::text IS NULL OR o.status = $1) \
           AND ($2::uuid IS NULL OR o.user_id = $2)",
    )
    .bind(&params.status)
    .bind(params.user_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "success": true,
        "data": orders,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct AdminOrderItem {
    id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
    price: rust_decimal::Decimal,
    total: rust_decimal::Decimal,
    product_name: String,
    product_slug: String,
    variant_name: Option<String>,
}

async fn order_by_id(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let order: AdminOrderRow = sqlx::query_as(
        "SELECT o.*, u.email, u.first_name, u.last_name \
         FROM orders o JOIN users u ON u.id = o.user_id \
         WHERE o.id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("Order"))?;

    let items: Vec<AdminOrderItem> = sqlx::query_as(
        "SELECT oi.id, oi.product_id, oi.variant_id, oi.quantity, oi.price, oi.total, \
                p.name AS product_name, p.slug AS product_slug, v.variant_name \
         FROM order_items oi \
         JOIN products p ON p.id = oi.product_id \
         LEFT JOIN product_variants v ON v.id = oi.variant_id \
         WHERE oi.order_id = $1",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    let shipping_address: Option<UserAddress> =
        sqlx::query_as("SELECT * FROM user_addresses WHERE id = $1")
            .bind(order.order.shipping_address_id)
            .fetch_optional(&state.db)
            .await?;
    let billing_address: Option<UserAddress> =
        sqlx::query_as("SELECT * FROM user_addresses WHERE id = $1")
            .bind(order.order.billing_address_id)
            .fetch_optional(&state.db)
            .await?;

    let mut data = serde_json::to_value(&order).unwrap_or_default();
    if let Some(map) = data.as_object_mut() {
        map.insert("items".into(), json!(items));
        map.insert("shipping_address".into(), json!(shipping_address));
        map.insert("billing_address".into(), json!(billing_address));
    }
    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

async fn update_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if !STATUSES.contains(&req.status.as_str()) {
        return Err(ApiError::BadRequest("Invalid order status".to_string()));
    }

    let current: Option<(String,)> = sqlx::query_as("SELECT status FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    let (current,) = current.ok_or(ApiError::NotFound("Order"))?;

    if !is_valid_transition(&current, &req.status) {
        return Err(ApiError::BadRequest(format!(
            "Cannot move order from {current} to {}",
            req.status
        )));
    }

    let order: Order = sqlx::query_as(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.status)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": order })))
}

#[cfg(test)]
mod tests {
    use super::is_valid_transition;

    #[test]
    fn forward_transitions_only() {
        assert!(is_valid_transition("pending", "processing"));
        assert!(is_valid_transition("processing", "shipped"));
        assert!(is_valid_transition("shipped", "delivered"));
        assert!(!is_valid_transition("pending", "shipped"));
        assert!(!is_valid_transition("delivered", "pending"));
        assert!(!is_valid_transition("shipped", "processing"));
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        assert!(is_valid_transition("pending", "cancelled"));
        assert!(is_valid_transition("processing", "cancelled"));
        assert!(is_valid_transition("shipped", "cancelled"));
        assert!(!is_valid_transition("delivered", "cancelled"));
        assert!(!is_valid_transition("cancelled", "cancelled"));
    }
}
