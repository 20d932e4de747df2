//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe: subscription lookup
//! over the REST API, plus a scripted mock for tests and local runs.
//!
//! Signature verification does not live here; it runs in the domain
//! against the raw request bytes before any adapter is involved.
//!
//! # Security
//!
//! - The API key is held as `secrecy::SecretString` and only exposed to build
//!   the basic-auth header

mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::MockPaymentProvider;
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter, DEFAULT_API_BASE_URL};
