//! # Discord Webhook Transport
//!
//! Submits replayed messages to a Discord webhook.
//!
//! One call to [`Transport::execute`] is one HTTP POST of a
//! [`WebhookMessage`]. Rate limiting is handled here and nowhere else: when
//! Discord answers `429 Too Many Requests` the client waits for the advertised
//! `retry_after` and sends the same payload again, up to a fixed number of
//! attempts. Every other failure is returned to the caller untouched.
//!
//! ## Rate Limits
//!
//! Discord webhooks have the following limits:
//! - **Requests**: 30 per minute
//! - **Embeds**: 10 per message
//! - **Fields**: 25 per embed

use std::fmt;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::WebhookMessage;

/// Wait used when a 429 carries no usable retry hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Something that can deliver a webhook payload.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Delivers one payload, retrying on rate limits if the transport supports it.
    ///
    /// # Returns
    /// * `Result<WebhookResponse>` - The final response, or an error for network
    ///   failures and non-success statuses
    async fn execute(&self, message: &WebhookMessage) -> Result<WebhookResponse>;
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: String,
}

impl fmt::Display for WebhookResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "<Response [{}]>", self.status.as_u16())
        } else {
            write!(f, "<Response [{}]> {}", self.status.as_u16(), self.body)
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Webhook client backed by `reqwest`.
pub struct DiscordWebhook {
    /// Reusable HTTP client for making webhook requests to Discord's API.
    client: Client,
    webhook_url: String,
    /// How many times a rate-limited request is re-sent before giving up.
    max_rate_limit_retries: u32,
}

impl DiscordWebhook {
    pub fn new(webhook_url: impl Into<String>, max_rate_limit_retries: u32) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
            max_rate_limit_retries,
        }
    }
}

#[async_trait]
impl Transport for DiscordWebhook {
    async fn execute(&self, message: &WebhookMessage) -> Result<WebhookResponse> {
        let mut retries = 0;

        loop {
            let response = self
                .client
                .post(&self.webhook_url)
                .json(message)
                .send()
                .await?;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && retries < self.max_rate_limit_retries {
                let header_hint = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<f64>().ok());
                let body = response.text().await?;
                let wait = retry_after(&body, header_hint);

                retries += 1;
                warn!(
                    "Rate limited by Discord, retrying in {:.3}s (attempt {}/{})",
                    wait.as_secs_f64(),
                    retries,
                    self.max_rate_limit_retries
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let body = response.text().await?;

            if !status.is_success() {
                return Err(anyhow!("Discord webhook returned {status}: {body}"));
            }

            debug!("Webhook accepted message for {}", message.username);
            return Ok(WebhookResponse { status, body });
        }
    }
}

/// Discord puts the wait (in seconds, possibly fractional) in the JSON body;
/// the `Retry-After` header is the fallback.
fn retry_after(body: &str, header_hint: Option<f64>) -> Duration {
    serde_json::from_str::<RateLimitBody>(body)
        .ok()
        .map(|limit| limit.retry_after)
        .or(header_hint)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
