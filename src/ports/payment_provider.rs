//! Payment provider port.
//!
//! The only outbound provider call this service makes is expanding a
//! checkout session's subscription id into a full snapshot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{SubscriptionSnapshot, WebhookError};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch the current state of a subscription by provider id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the provider has no such subscription
    /// - `Timeout` / `NetworkError` on transport failure
    /// - `ProviderError` for any other non-success response
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError>;
}

/// Payment provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(
            PaymentErrorCode::NotFound,
            format!("{} not found", resource),
        )
    }

    /// Create a generic provider error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    /// Whether a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Every provider failure is a server-side error: the provider should redeliver.
impl From<PaymentError> for WebhookError {
    fn from(err: PaymentError) -> Self {
        match err.code {
            PaymentErrorCode::Timeout => WebhookError::Timeout("payment provider"),
            _ => WebhookError::Provider(err.to_string()),
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Request exceeded its time budget.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    // Trait object safety test
    #[test]
    fn payment_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PaymentProvider) {}
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentErrorCode::NetworkError.is_retryable());
        assert!(PaymentErrorCode::Timeout.is_retryable());
        assert!(PaymentErrorCode::RateLimitExceeded.is_retryable());

        assert!(!PaymentErrorCode::NotFound.is_retryable());
        assert!(!PaymentErrorCode::AuthenticationError.is_retryable());
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::not_found("Subscription sub_1");
        assert_eq!(err.to_string(), "not_found: Subscription sub_1 not found");
    }

    #[test]
    fn payment_error_keeps_provider_code() {
        let err = PaymentError::provider("boom").with_provider_code("api_error");
        assert_eq!(err.provider_code.as_deref(), Some("api_error"));
    }

    #[test]
    fn every_payment_error_becomes_a_server_error() {
        let errors = [
            PaymentError::network("reset"),
            PaymentError::timeout("slow"),
            PaymentError::authentication("bad key"),
            PaymentError::not_found("Subscription sub_1"),
            PaymentError::provider("500"),
        ];

        for err in errors {
            let webhook_err: WebhookError = err.into();
            assert_eq!(webhook_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(webhook_err.is_retryable());
        }
    }

    #[test]
    fn timeout_maps_to_webhook_timeout() {
        let webhook_err: WebhookError = PaymentError::timeout("slow").into();
        assert!(matches!(webhook_err, WebhookError::Timeout(_)));
    }
}
