//! Transactional email via the Resend HTTP API.
//!
//! Without a `RESEND_API_KEY` the mailer degrades to logging the code,
//! which keeps local development and tests free of external calls.

use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_key: Option<String>,
    from: String,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.resend_api_key.clone(),
            from: config.email_from.clone(),
        }
    }

    /// Send a one-time code to `to`.
    pub async fn send_otp(&self, to: &str, subject: &str, otp: &str) -> Result<(), ApiError> {
        let Some(api_key) = &self.api_key else {
            tracing::info!(%to, %otp, "email delivery not configured, logging code instead");
            return Ok(());
        };

        let body = json!({
            "from": self.from,
            "to": [to],
            "subject": subject,
            "html": format!(
                "<h2>{subject}</h2><p>Your verification code:</p><h1>{otp}</h1>\
                 <p>This code expires in 10 minutes.</p>"
            ),
        });

        self.http
            .post(RESEND_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(%to, "otp email sent");
        Ok(())
    }
}
