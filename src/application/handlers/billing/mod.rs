//! Billing handlers.
//!
//! Request-scoped handlers that turn a verified provider notification into
//! a reconciled account entitlement:
//!
//! - `SubscriptionResolver` - subscription → account id, four strategies in order
//! - `PlanReconciler` - subscription mirror upsert + entitlement update
//! - `EventDispatcher` - routes each event type to its reconciliation path
//! - `HandleSubscriptionWebhookHandler` - verify → decode → dispatch

mod dispatch_event;
mod handle_subscription_webhook;
mod reconcile_plan;
mod resolve_account;
mod store_call;

#[cfg(test)]
mod test_support;

pub use dispatch_event::{EventDispatcher, IgnoreReason, WebhookOutcome};
pub use handle_subscription_webhook::{
    HandleSubscriptionWebhookCommand, HandleSubscriptionWebhookHandler,
};
pub use reconcile_plan::{PlanReconciler, Reconciliation};
pub use resolve_account::{Resolution, ResolutionStrategy, SubscriptionResolver};
pub use store_call::DEFAULT_STORE_TIMEOUT;
