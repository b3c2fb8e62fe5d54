//! Environment-driven configuration.

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_origin: Option<String>,
    pub nats_url: Option<String>,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    /// Lifetime of issued bearer tokens, in hours.
    pub token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            port: std::env::var("PORT")
                .ok()
                .map(|p| p.parse())
                .transpose()
                .context("PORT must be a number")?
                .unwrap_or(4000),
            cors_origin: std::env::var("CORS_ORIGIN").ok(),
            nats_url: std::env::var("NATS_URL").ok(),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "KIE Store <onboarding@resend.dev>".to_string()),
            token_ttl_hours: std::env::var("TOKEN_TTL_HOURS")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("TOKEN_TTL_HOURS must be a number")?
                .unwrap_or(24 * 7),
        })
    }
}
