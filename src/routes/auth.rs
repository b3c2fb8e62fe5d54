//! Registration, login, profile and OTP-based password/email flows.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    generate_otp, hash_password, issue_token, otp_expiry, verify_password, AuthUser,
};
use crate::error::{ApiError, ApiResult};
use crate::models::{User, USER_COLUMNS};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me).put(update_me))
        .route("/change-password", put(change_password))
        .route("/forgot-password", post(forgot_password))
        .route("/verify-reset-otp", post(verify_reset_otp))
        .route("/reset-password", post(reset_password))
        .route("/send-email-verification", post(send_email_verification))
        .route("/verify-email", post(verify_email))
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    first_name: String,
    last_name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    req.validate()?;

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    // Role is never taken from the request body.
    let password_hash = hash_password(&req.password)?;
    let user: User = sqlx::query_as(&format!(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, role) \
         VALUES ($1, $2, $3, $4, $5, 'customer') \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::now_v7())
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": user })),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let row: Option<(Uuid, String, bool)> =
        sqlx::query_as("SELECT id, password_hash, is_active FROM users WHERE email = $1")
            .bind(&req.email)
            .fetch_optional(&state.db)
            .await?;
    let (user_id, password_hash, is_active) = row.ok_or(ApiError::InvalidCredentials)?;
    if !is_active {
        return Err(ApiError::InvalidCredentials);
    }
    verify_password(&req.password, &password_hash)?;

    let user: User = sqlx::query_as(&format!(
        "UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .fetch_one(&state.db)
    .await?;

    let token = issue_token(&state.db, user.id, state.config.token_ttl_hours).await?;
    Ok(Json(json!({ "token": token, "user": user })))
}

async fn me(AuthUser(user): AuthUser) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": user }))
}

#[derive(Debug, Deserialize)]
struct UpdateMeRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    avatar_url: Option<String>,
}

async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let updated: User = sqlx::query_as(&format!(
        "UPDATE users SET \
             first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name), \
             phone = COALESCE($4, phone), \
             avatar_url = COALESCE($5, avatar_url), \
             updated_at = NOW() \
         WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(user.id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.phone)
    .bind(&req.avatar_url)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": updated })))
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.new_password.len() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let current_hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&state.db)
        .await?;
    verify_password(&req.current_password, &current_hash)
        .map_err(|_| ApiError::BadRequest("Current password is incorrect".to_string()))?;

    let new_hash = hash_password(&req.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user.id)
        .bind(&new_hash)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password updated successfully",
    })))
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let user: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;
    if user.is_none() {
        return Err(ApiError::NotFound("User"));
    }

    let otp = generate_otp();

    // One live code per email.
    sqlx::query("DELETE FROM password_reset_otps WHERE email = $1")
        .bind(&req.email)
        .execute(&state.db)
        .await?;
    sqlx::query(
        "INSERT INTO password_reset_otps (id, email, otp, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::now_v7())
    .bind(&req.email)
    .bind(&otp)
    .bind(otp_expiry())
    .execute(&state.db)
    .await?;

    state
        .mailer
        .send_otp(&req.email, "Reset your password", &otp)
        .await?;

    Ok(Json(json!({ "success": true, "message": "OTP sent to email" })))
}

#[derive(Debug, Deserialize)]
struct VerifyOtpRequest {
    email: String,
    otp: String,
}

async fn verify_reset_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let record: Option<(Uuid, bool)> = sqlx::query_as(
        "SELECT id, expires_at > NOW() FROM password_reset_otps WHERE email = $1 AND otp = $2",
    )
    .bind(&req.email)
    .bind(&req.otp)
    .fetch_optional(&state.db)
    .await?;

    let (id, live) = record.ok_or_else(|| ApiError::BadRequest("Invalid OTP".to_string()))?;
    if !live {
        sqlx::query("DELETE FROM password_reset_otps WHERE id = $1")
            .bind(id)
            .execute(&state.db)
            .await?;
        return Err(ApiError::BadRequest("OTP expired".to_string()));
    }

    // Mark verified; the reset endpoint consumes it.
    sqlx::query("UPDATE password_reset_otps SET verified = TRUE WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    email: String,
    new_password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.new_password.len() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    // A reset requires a previously verified, unexpired code.
    let verified: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM password_reset_otps \
         WHERE email = $1 AND verified AND expires_at > NOW()",
    )
    .bind(&req.email)
    .fetch_optional(&state.db)
    .await?;
    let (otp_id,) =
        verified.ok_or_else(|| ApiError::BadRequest("Invalid or expired OTP".to_string()))?;

    let user: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;
    let (user_id,) = user.ok_or(ApiError::NotFound("User"))?;

    let new_hash = hash_password(&req.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(&new_hash)
        .execute(&state.db)
        .await?;
    sqlx::query("DELETE FROM password_reset_otps WHERE id = $1")
        .bind(otp_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password reset successful",
    })))
}

async fn send_email_verification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    if user.is_email_verified {
        return Err(ApiError::BadRequest("Email already verified".to_string()));
    }

    let otp = generate_otp();
    sqlx::query("DELETE FROM email_verification_otps WHERE email = $1")
        .bind(&user.email)
        .execute(&state.db)
        .await?;
    sqlx::query(
        "INSERT INTO email_verification_otps (id, email, otp, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::now_v7())
    .bind(&user.email)
    .bind(&otp)
    .bind(otp_expiry())
    .execute(&state.db)
    .await?;

    state
        .mailer
        .send_otp(&user.email, "Verify your email", &otp)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Verification code sent",
    })))
}

#[derive(Debug, Deserialize)]
struct VerifyEmailRequest {
    otp: String,
}

async fn verify_email(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let record: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM email_verification_otps \
         WHERE email = $1 AND otp = $2 AND expires_at > NOW()",
    )
    .bind(&user.email)
    .bind(&req.otp)
    .fetch_optional(&state.db)
    .await?;
    if record.is_none() {
        return Err(ApiError::BadRequest("Invalid or expired code".to_string()));
    }

    sqlx::query("UPDATE users SET is_email_verified = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await?;
    sqlx::query("DELETE FROM email_verification_otps WHERE email = $1")
        .bind(&user.email)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Email verified successfully",
    })))
}
