//! Webhook error types for subscription webhook handling.
//!
//! Every failure path of a webhook request maps to one of these variants
//! before it reaches the HTTP boundary. Status codes drive the provider's
//! retry behaviour:
//! - 2xx: acknowledged, no retry
//! - 4xx: client error, no retry
//! - 5xx: server error, provider retries

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header was absent.
    #[error("Missing signature header")]
    MissingSignature,

    /// Signature header was present but malformed or did not match.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Signed timestamp is outside the replay window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Body is not a structurally valid event.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// An Account Store read or write failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Fetching a subscription snapshot from the provider failed.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// An external call exceeded its time budget.
    #[error("Timed out: {0}")]
    Timeout(&'static str),

    /// A required credential is not configured.
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),
}

impl WebhookError {
    /// True for the AuthenticationError family.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::InvalidSignature(_)
                | WebhookError::TimestampOutOfRange
        )
    }

    /// Returns true if the provider should redeliver this webhook.
    ///
    /// Only transient infrastructure failures qualify; the same idempotent
    /// write is expected to succeed on a later delivery.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Persistence(_) | WebhookError::Provider(_) | WebhookError::Timeout(_)
        )
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature(_)
            | WebhookError::TimestampOutOfRange
            | WebhookError::MalformedEvent(_) => StatusCode::BAD_REQUEST,

            WebhookError::Persistence(_)
            | WebhookError::Provider(_)
            | WebhookError::Timeout(_)
            | WebhookError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Store failures are always persistence errors at this boundary.
impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_signature_displays_correctly() {
        assert_eq!(
            format!("{}", WebhookError::MissingSignature),
            "Missing signature header"
        );
    }

    #[test]
    fn malformed_event_displays_reason() {
        let err = WebhookError::MalformedEvent("missing field `type`".to_string());
        assert_eq!(format!("{}", err), "Malformed event: missing field `type`");
    }

    #[test]
    fn authentication_family() {
        assert!(WebhookError::MissingSignature.is_authentication());
        assert!(WebhookError::InvalidSignature("mismatch".into()).is_authentication());
        assert!(WebhookError::TimestampOutOfRange.is_authentication());
        assert!(!WebhookError::MalformedEvent("bad".into()).is_authentication());
    }

    #[test]
    fn client_errors_are_bad_request_and_not_retryable() {
        let errors = [
            WebhookError::MissingSignature,
            WebhookError::InvalidSignature("mismatch".into()),
            WebhookError::TimestampOutOfRange,
            WebhookError::MalformedEvent("bad json".into()),
        ];

        for err in errors {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn infrastructure_errors_are_server_errors_and_retryable() {
        let errors = [
            WebhookError::Persistence("connection lost".into()),
            WebhookError::Provider("502".into()),
            WebhookError::Timeout("account store"),
        ];

        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn not_configured_is_server_error() {
        let err = WebhookError::NotConfigured("webhook secret");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn domain_error_converts_to_persistence() {
        let err: WebhookError = DomainError::database("deadlock detected").into();
        assert!(matches!(err, WebhookError::Persistence(msg) if msg.contains("deadlock")));
    }
}
