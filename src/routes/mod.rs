//! HTTP route table.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::AppState;

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;
pub mod wishlist;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .nest("/api/v1/auth", auth::router())
        .nest("/api/v1/products", products::router())
        .nest("/api/v1/categories", categories::router())
        .nest("/api/v1/cart", cart::router())
        .nest("/api/v1/orders", orders::router())
        .nest("/api/v1/wishlist", wishlist::router())
        .nest("/api/v1/addresses", addresses::router())
        .nest("/api/v1/admin/products", admin::products::router())
        .nest("/api/v1/admin/categories", admin::categories::router())
        .nest("/api/v1/admin/orders", admin::orders::router())
        .nest("/api/v1/admin/inventory", admin::inventory::router())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now(),
        "service": "kie-store-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn welcome() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to KIE Store API",
        "health": "/health",
    }))
}
