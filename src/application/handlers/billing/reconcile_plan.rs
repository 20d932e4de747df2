//! PlanReconciler - mirrors a subscription snapshot into the Account Store.
//!
//! Two sequential writes: the subscription record upsert, then the
//! entitlement update. A failure after the first write leaves an accurate
//! mirror with a stale entitlement; the error is surfaced so the provider
//! redelivers, and re-applying the same snapshot repairs it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::domain::billing::{
    AccountSubscriptionRecord, Entitlement, Plan, SubscriptionSnapshot, WebhookError,
};
use crate::domain::foundation::AccountId;
use crate::ports::AccountStore;

use super::store_call::{bounded, DEFAULT_STORE_TIMEOUT};

/// What a reconciliation wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub account_id: AccountId,
    pub plan: Option<Plan>,
    pub entitlement: Entitlement,
}

/// Writes subscription mirrors and entitlements.
pub struct PlanReconciler {
    store: Arc<dyn AccountStore>,
    store_timeout: Duration,
}

impl PlanReconciler {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Reconciles `account_id` to `subscription`.
    ///
    /// # Errors
    ///
    /// `Persistence` or `Timeout` if either write fails. The record upsert is
    /// not rolled back when the entitlement update fails.
    pub async fn reconcile(
        &self,
        subscription: &SubscriptionSnapshot,
        account_id: &AccountId,
    ) -> Result<Reconciliation, WebhookError> {
        let record = AccountSubscriptionRecord::from_snapshot(
            account_id.clone(),
            subscription,
            Utc::now(),
        );
        let entitlement = record.entitlement();

        bounded(
            self.store_timeout,
            "subscription record upsert",
            self.store.upsert_subscription_record(&record),
        )
        .await
        .map_err(|e| {
            tracing::error!(
                account_id = %account_id,
                subscription_id = %subscription.id,
                error = %e,
                "Subscription record upsert failed"
            );
            e
        })?;

        bounded(
            self.store_timeout,
            "entitlement update",
            self.store.update_entitlement(account_id, entitlement),
        )
        .await
        .map_err(|e| {
            tracing::error!(
                account_id = %account_id,
                subscription_id = %subscription.id,
                entitlement = %entitlement,
                error = %e,
                "Entitlement update failed after subscription record was written"
            );
            e
        })?;

        Ok(Reconciliation {
            account_id: account_id.clone(),
            plan: record.plan,
            entitlement,
        })
    }
}
