//! HTTP adapters - REST API implementations.

pub mod billing;

pub use billing::{app_router, WebhookAppState};
