//! Adapters - Implementations of port interfaces.
//!
//! - `http` - Webhook endpoint (axum)
//! - `memory` - In-memory account store for tests and local runs
//! - `postgres` - PostgreSQL account store
//! - `stripe` - Stripe payment provider client and mock

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use memory::InMemoryAccountStore;
pub use postgres::PostgresAccountStore;
pub use stripe::{MockPaymentProvider, StripeConfig, StripePaymentAdapter};
