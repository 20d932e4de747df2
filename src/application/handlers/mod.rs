//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    EventDispatcher, HandleSubscriptionWebhookCommand, HandleSubscriptionWebhookHandler,
    IgnoreReason, PlanReconciler, Reconciliation, Resolution, ResolutionStrategy,
    SubscriptionResolver, WebhookOutcome, DEFAULT_STORE_TIMEOUT,
};
