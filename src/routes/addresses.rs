//! Address book endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::models::UserAddress;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_addresses).post(create_address))
}

async fn list_addresses(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let addresses: Vec<UserAddress> = sqlx::query_as(
        "SELECT * FROM user_addresses WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": addresses })))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateAddressRequest {
    #[serde(default = "default_address_type")]
    address_type: String,
    #[validate(length(min = 1, message = "Missing required fields"))]
    address_line1: String,
    address_line2: Option<String>,
    #[validate(length(min = 1, message = "Missing required fields"))]
    city: String,
    state: Option<String>,
    #[validate(length(min = 1, message = "Missing required fields"))]
    country: String,
    #[validate(length(min = 1, message = "Missing required fields"))]
    postal_code: String,
    #[serde(default)]
    is_default: bool,
}

fn default_address_type() -> String {
    "home".to_string()
}

async fn create_address(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateAddressRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    req.validate()?;

    let address: UserAddress = sqlx::query_as(
        "INSERT INTO user_addresses (id, user_id, address_type, address_line1, address_line2, \
                                     city, state, country, postal_code, is_default) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user.id)
    .bind(&req.address_type)
    .bind(&req.address_line1)
    .bind(&req.address_line2)
    .bind(&req.city)
    .bind(&req.state)
    .bind(&req.country)
    .bind(&req.postal_code)
    .bind(req.is_default)
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": address })),
    ))
}
