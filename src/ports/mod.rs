//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentProvider` - Subscription lookup at the payment provider
//! - `AccountStore` - Subscription mirror and entitlement persistence

mod account_store;
mod payment_provider;

pub use account_store::AccountStore;
pub use payment_provider::{PaymentError, PaymentErrorCode, PaymentProvider};
