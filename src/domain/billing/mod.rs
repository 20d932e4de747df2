//! Billing domain module.
//!
//! Everything needed to turn an authenticated provider notification into a
//! reconciled entitlement, without performing any I/O.
//!
//! # Module Structure
//!
//! - `webhook_verifier` - HMAC signature verification over the raw body
//! - `event` - Event envelope decoding and the typed event union
//! - `stripe_objects` - Provider payload shapes (subscription, checkout session)
//! - `subscription` - Subscription snapshot, status and billing interval
//! - `plan` - Plan tier and entitlement derivation
//! - `record` - Account subscription mirror record
//! - `webhook_errors` - Request-level error taxonomy

mod event;
mod plan;
mod record;
mod stripe_objects;
mod subscription;
mod webhook_errors;
mod webhook_verifier;

pub use event::{BillingEvent, CheckoutCompletion, EventEnvelope, EventKind, SubscriptionChange};
pub use plan::{Entitlement, Plan};
pub use record::AccountSubscriptionRecord;
pub use stripe_objects::{Expandable, StripeCheckoutSession, StripeSubscription};
pub use subscription::{
    BillingInterval, SubscriptionSnapshot, SubscriptionStatus, ACCOUNT_METADATA_KEYS,
};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{SignatureHeader, WebhookVerifier, DEFAULT_TOLERANCE_SECS};

#[cfg(test)]
pub use subscription::SubscriptionSnapshotBuilder;
#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
