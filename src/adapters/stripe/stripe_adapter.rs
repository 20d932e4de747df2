//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key).with_request_timeout(Duration::from_secs(10));
//! let adapter = StripePaymentAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::{StripeSubscription, SubscriptionSnapshot};
use crate::ports::{PaymentError, PaymentErrorCode, PaymentProvider};

/// Default Stripe API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Upper bound for a single API request.
    request_timeout: Duration,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Stripe error body: `{"error": {"type": ..., "code": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaymentError::provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn transport_error(err: reqwest::Error) -> PaymentError {
        if err.is_timeout() {
            PaymentError::timeout(err.to_string())
        } else {
            PaymentError::network(err.to_string())
        }
    }
}

/// Maps a non-success Stripe response to a `PaymentError`.
fn error_from_response(status: reqwest::StatusCode, body: &str, resource: &str) -> PaymentError {
    let detail = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status.as_u16()));

    let error = match status {
        reqwest::StatusCode::NOT_FOUND => PaymentError::not_found(resource),
        reqwest::StatusCode::UNAUTHORIZED => PaymentError::authentication(message),
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            PaymentError::new(PaymentErrorCode::RateLimitExceeded, message)
        }
        _ => PaymentError::provider(message),
    };

    match detail.and_then(|d| d.code) {
        Some(code) => error.with_provider_code(code),
        None => error,
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let error = error_from_response(
                status,
                &error_text,
                &format!("Subscription {}", subscription_id),
            );
            tracing::error!(
                subscription_id = %subscription_id,
                status = status.as_u16(),
                error = %error,
                "Stripe fetch_subscription failed"
            );
            return Err(error);
        }

        let stripe_sub: StripeSubscription = response.json().await.map_err(|e| {
            if e.is_timeout() {
                return PaymentError::timeout(e.to_string());
            }
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        SubscriptionSnapshot::try_from(stripe_sub)
            .map_err(|e| PaymentError::provider(format!("Invalid Stripe subscription: {}", e)))
    }
}
