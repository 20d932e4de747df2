//! Route definitions for the webhook service.

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::routing::{get, post};
use axum::Router;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{handle_layer_error, handle_stripe_webhook, health, WebhookAppState};

/// Webhook routes (no auth - signature verification instead).
///
/// Only POST is routed on the webhook path, so any other method is answered
/// with 405 by the method router.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/webhooks/stripe", post(handle_stripe_webhook))
}

/// Liveness route.
pub fn health_routes() -> Router<WebhookAppState> {
    Router::new().route("/health", get(health))
}

/// Full application router with tracing and a per-request timeout.
///
/// An elapsed request is answered like any other internal failure (500),
/// so the provider redelivers it.
pub fn app_router(state: WebhookAppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(webhook_routes())
        .merge(health_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(HandleErrorLayer::new(handle_layer_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}
