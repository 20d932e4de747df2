//! Account subscription mirror record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::AccountId;

use super::plan::{Entitlement, Plan};
use super::subscription::{SubscriptionSnapshot, SubscriptionStatus};

/// Point-in-time mirror of a subscription, one row per account.
///
/// `account_id` is the upsert conflict key. The provider ids are advisory
/// and only used to resolve later events back to this account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSubscriptionRecord {
    pub account_id: AccountId,
    pub provider_customer_id: String,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub plan: Option<Plan>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub updated_at: DateTime<Utc>,
}

impl AccountSubscriptionRecord {
    /// Builds the mirror row for `account_id` from a snapshot.
    pub fn from_snapshot(
        account_id: AccountId,
        snapshot: &SubscriptionSnapshot,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            provider_customer_id: snapshot.customer_id.clone(),
            provider_subscription_id: snapshot.id.clone(),
            status: snapshot.status.clone(),
            plan: Plan::from_interval(snapshot.billing_interval),
            current_period_end: snapshot.current_period_end,
            cancel_at_period_end: snapshot.cancel_at_period_end,
            updated_at,
        }
    }

    /// Entitlement implied by this record's status.
    pub fn entitlement(&self) -> Entitlement {
        Entitlement::for_status(&self.status)
    }
}
