//! Account Store port.
//!
//! The relational store holding one subscription mirror row per account and
//! the account's entitlement. This service reads and updates existing
//! accounts; it never creates them.

use async_trait::async_trait;

use crate::domain::billing::{AccountSubscriptionRecord, Entitlement};
use crate::domain::foundation::{AccountId, DomainError};

/// Port for subscription mirror and entitlement persistence.
///
/// Implementations must make `upsert_subscription_record` atomic per
/// `account_id`; concurrent deliveries for one account rely on it.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Account whose recorded subscription has this provider id.
    ///
    /// Returns the most recently updated match, or `None`.
    async fn find_account_id_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<AccountId>, DomainError>;

    /// Account whose recorded subscription belongs to this provider customer.
    ///
    /// Returns the most recently updated match, or `None`.
    async fn find_account_id_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<AccountId>, DomainError>;

    /// Insert or overwrite the subscription mirror keyed by `record.account_id`.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account does not exist
    /// - `DatabaseError` on persistence failure
    async fn upsert_subscription_record(
        &self,
        record: &AccountSubscriptionRecord,
    ) -> Result<(), DomainError>;

    /// Set the account's entitlement.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if no account row was updated
    /// - `DatabaseError` on persistence failure
    async fn update_entitlement(
        &self,
        account_id: &AccountId,
        entitlement: Entitlement,
    ) -> Result<(), DomainError>;
}
