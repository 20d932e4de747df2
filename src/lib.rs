//! Entitlement Sync - subscription-state reconciliation service
//!
//! Receives signed payment provider webhooks, resolves the affected account,
//! mirrors the subscription and keeps the account's entitlement in step with
//! the provider's view of its plan.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
