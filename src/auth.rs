//! Password hashing, bearer tokens and the auth extractors.
//!
//! Sessions are opaque random tokens stored in `auth_tokens` with an
//! expiry; handlers receive the resolved user through the [`AuthUser`]
//! and [`AdminUser`] extractors.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::User;
use crate::AppState;

const TOKEN_LENGTH: usize = 48;

/// How long password-reset and email-verification codes stay valid.
pub const OTP_TTL_MINUTES: i64 = 10;

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::BadRequest(format!("Failed to hash password: {err}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|_| ApiError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::InvalidCredentials)
}

/// Issue a fresh bearer token for the user.
pub async fn issue_token(db: &PgPool, user_id: Uuid, ttl_hours: i64) -> Result<String, ApiError> {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);

    sqlx::query("INSERT INTO auth_tokens (id, user_id, token, expires_at) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(&token)
        .bind(expires_at)
        .execute(db)
        .await?;

    Ok(token)
}

/// Six-digit one-time code for password reset and email verification.
pub fn generate_otp() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

pub fn otp_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::minutes(OTP_TTL_MINUTES)
}

async fn user_for_token(db: &PgPool, token: &str) -> Result<Option<User>, ApiError> {
    let user: Option<User> = sqlx::query_as(
        "SELECT u.id, u.email, u.first_name, u.last_name, u.phone, u.avatar_url, u.role, \
                u.is_active, u.is_email_verified, u.last_login, u.created_at, u.updated_at \
         FROM auth_tokens t \
         JOIN users u ON u.id = t.user_id \
         WHERE t.token = $1 AND t.expires_at > NOW() AND u.is_active",
    )
    .bind(token)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Extractor for any authenticated, active user.
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        user_for_token(&state.db, token)
            .await?
            .map(Self)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Extractor for users with the `admin` role.
pub struct AdminUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != "admin" {
            return Err(ApiError::Forbidden);
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(verify_password("wrong horse", &hash).is_err());
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..20 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
