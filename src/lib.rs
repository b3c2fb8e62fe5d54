//! KIE Store backend
//!
//! REST API for a shopping application:
//! - Product catalog and category tree
//! - Shopping cart, wishlist and addresses
//! - Order placement and order history
//! - Admin catalog, inventory and order management
//!
//! The order-placement path in [`checkout`] is the one piece with real
//! invariants (atomic stock check-then-decrement); everything else is
//! thin request-to-query plumbing.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod checkout;
pub mod config;
pub mod error;
pub mod events;
pub mod mailer;
pub mod models;
pub mod pricing;
pub mod routes;

pub use config::Config;
pub use mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub nats: Option<async_nats::Client>,
    pub mailer: Mailer,
    pub config: Arc<Config>,
}

/// Build the full application router with tracing and CORS applied.
pub fn app(state: AppState) -> Router {
    let cors = match state
        .config
        .cors_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        None => CorsLayer::permissive(),
    };

    routes::api_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
