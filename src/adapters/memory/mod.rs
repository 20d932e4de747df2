//! In-memory adapters for tests and local development.

mod account_store;

pub use account_store::InMemoryAccountStore;
