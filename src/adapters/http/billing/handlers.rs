//! HTTP handlers for the webhook endpoint.
//!
//! The body is handed to the application layer as the exact bytes received;
//! nothing here parses or re-encodes it.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    HandleSubscriptionWebhookCommand, HandleSubscriptionWebhookHandler, WebhookOutcome,
};
use crate::domain::billing::WebhookError;

use super::dto::{ErrorResponse, HealthResponse, WebhookAck};

/// Header carrying the provider signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Upper bound for a webhook body.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Generic body for every internal failure.
const INTERNAL_ERROR_MESSAGE: &str = "Webhook handler failed";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the webhook routes.
///
/// `handler` is `None` when a required credential is missing; the endpoint
/// then fails closed with 500.
#[derive(Clone)]
pub struct WebhookAppState {
    handler: Option<Arc<HandleSubscriptionWebhookHandler>>,
    missing_credentials: Arc<Vec<String>>,
}

impl WebhookAppState {
    /// State for a fully configured service.
    pub fn configured(handler: HandleSubscriptionWebhookHandler) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
            missing_credentials: Arc::new(Vec::new()),
        }
    }

    /// State for a service missing one or more credentials.
    pub fn unconfigured(missing_credentials: Vec<String>) -> Self {
        Self {
            handler: None,
            missing_credentials: Arc::new(missing_credentials),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.handler.is_some()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe - Handle Stripe subscription webhooks
pub async fn handle_stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<WebhookAck>, WebhookApiError> {
    let Some(handler) = state.handler.as_ref() else {
        tracing::error!(
            missing = ?state.missing_credentials,
            "Webhook received but service is missing credentials"
        );
        return Err(WebhookError::NotConfigured("webhook credentials").into());
    };

    let signature = match headers.get(SIGNATURE_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| {
                    WebhookError::InvalidSignature("signature header is not valid ASCII".into())
                })?
                .to_string(),
        ),
        None => None,
    };

    let payload = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_BYTES)
        .await
        .map_err(|e| WebhookError::MalformedEvent(format!("unreadable body: {}", e)))?;

    let cmd = HandleSubscriptionWebhookCommand {
        payload: payload.to_vec(),
        signature,
    };

    match handler.handle(cmd).await? {
        WebhookOutcome::Reconciled { .. } => {}
        WebhookOutcome::Unresolved { subscription_id } => {
            tracing::debug!(subscription_id = %subscription_id, "Acknowledged unresolved event");
        }
        WebhookOutcome::Ignored(reason) => {
            tracing::debug!(reason = ?reason, "Acknowledged ignored event");
        }
    }

    Ok(Json(WebhookAck::received()))
}

/// Maps the request timeout layer's error onto the webhook error body.
///
/// The timeout layer is the only fallible middleware, so every error here
/// is an elapsed request.
pub async fn handle_layer_error(err: tower::BoxError) -> WebhookApiError {
    tracing::debug!(error = %err, "Request timeout layer fired");
    WebhookError::Timeout("request").into()
}

/// GET /health - Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();

        let message = if status == StatusCode::BAD_REQUEST {
            self.0.to_string()
        } else {
            tracing::error!(
                error = %self.0,
                retryable = self.0.is_retryable(),
                "Webhook handling failed"
            );
            INTERNAL_ERROR_MESSAGE.to_string()
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn client_errors_expose_message() {
        let response = WebhookApiError(WebhookError::MissingSignature).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Missing signature header"})
        );
    }

    #[tokio::test]
    async fn malformed_event_is_bad_request() {
        let response =
            WebhookApiError(WebhookError::MalformedEvent("missing field `type`".into()))
                .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn server_errors_are_generic() {
        let response =
            WebhookApiError(WebhookError::Persistence("password=hunter2 host=db".into()))
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Webhook handler failed"})
        );
    }

    #[tokio::test]
    async fn unconfigured_state_fails_closed() {
        let state = WebhookAppState::unconfigured(vec!["payment.stripe_webhook_secret".into()]);
        assert!(!state.is_configured());

        let app = Router::new()
            .route("/webhooks/stripe", post(handle_stripe_webhook))
            .with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/stripe")
                    .header(SIGNATURE_HEADER, "t=1,v1=00")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn elapsed_request_is_generic_server_error() {
        let err: tower::BoxError = Box::new(tower::timeout::error::Elapsed::new());

        let response = handle_layer_error(err).await.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Webhook handler failed"})
        );
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(body) = health().await;
        assert_eq!(body, HealthResponse::ok());
    }
}
