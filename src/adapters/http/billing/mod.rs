//! HTTP surface for provider webhooks.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, HealthResponse, WebhookAck};
pub use handlers::{
    handle_layer_error, handle_stripe_webhook, health, WebhookApiError, WebhookAppState,
    MAX_WEBHOOK_BODY_BYTES, SIGNATURE_HEADER,
};
pub use routes::{app_router, health_routes, webhook_routes};
