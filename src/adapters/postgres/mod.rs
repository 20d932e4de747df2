//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresAccountStore` - Subscription mirror rows and account entitlements

mod account_store;

pub use account_store::PostgresAccountStore;
