//! Payment configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: Option<String>,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: Option<String>,

    /// Base URL of the Stripe API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for a single Stripe API request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Accepted age of a webhook signature timestamp, in seconds
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,

    /// Acknowledge test-mode events without acting on them
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    pub fn stripe_api_key(&self) -> Option<&str> {
        self.stripe_api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn stripe_webhook_secret(&self) -> Option<&str> {
        self.stripe_webhook_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key()
            .is_some_and(|k| k.starts_with("sk_test_"))
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key()
            .is_some_and(|k| k.starts_with("sk_live_"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate payment configuration
    ///
    /// Absent credentials pass; present ones must carry the expected prefix.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(key) = self.stripe_api_key() {
            if !key.starts_with("sk_") && !key.starts_with("rk_") {
                return Err(ValidationError::InvalidStripeKey);
            }
        }
        if let Some(secret) = self.stripe_webhook_secret() {
            if !secret.starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
        }
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://")
        {
            return Err(ValidationError::InvalidStripeBaseUrl);
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.signature_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidSignatureTolerance);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: None,
            stripe_webhook_secret: None,
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            signature_tolerance_secs: default_signature_tolerance(),
            require_livemode: false,
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_signature_tolerance() -> i64 {
    300
}
