//! SubscriptionResolver - determines which account a subscription belongs to.
//!
//! Strategies are tried in a fixed order and the first hit wins:
//!
//! 1. Account id supplied by the caller (checkout `client_reference_id`)
//! 2. Account id embedded in the subscription metadata
//! 3. Recorded mirror row with the same provider subscription id
//! 4. Recorded mirror row with the same provider customer id
//!
//! No strategy is an error when it misses; only store failures are.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{SubscriptionSnapshot, WebhookError};
use crate::domain::foundation::AccountId;
use crate::ports::AccountStore;

use super::store_call::{bounded, DEFAULT_STORE_TIMEOUT};

/// Which correlation signal produced the account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    SuppliedAccountId,
    SubscriptionMetadata,
    RecordedSubscriptionId,
    RecordedCustomerId,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SuppliedAccountId => "supplied_account_id",
            Self::SubscriptionMetadata => "subscription_metadata",
            Self::RecordedSubscriptionId => "recorded_subscription_id",
            Self::RecordedCustomerId => "recorded_customer_id",
        };
        write!(f, "{}", s)
    }
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub account_id: AccountId,
    pub strategy: ResolutionStrategy,
}

impl Resolution {
    fn new(account_id: AccountId, strategy: ResolutionStrategy) -> Self {
        Self {
            account_id,
            strategy,
        }
    }
}

/// Resolves subscriptions to account ids.
pub struct SubscriptionResolver {
    store: Arc<dyn AccountStore>,
    store_timeout: Duration,
}

impl SubscriptionResolver {
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

    /// Returns the owning account, or `None` when every strategy misses.
    ///
    /// `customer_id` overrides the snapshot's customer for step 4 when the
    /// caller has a better one (e.g. from a checkout session).
    ///
    /// # Errors
    ///
    /// `Persistence` or `Timeout` if a store lookup fails.
    pub async fn resolve(
        &self,
        subscription: &SubscriptionSnapshot,
        supplied_account_id: Option<&AccountId>,
        customer_id: Option<&str>,
    ) -> Result<Option<Resolution>, WebhookError> {
        if let Some(account_id) = supplied_account_id {
            return Ok(Some(Resolution::new(
                account_id.clone(),
                ResolutionStrategy::SuppliedAccountId,
            )));
        }

        if let Some(account_id) = subscription.metadata_account_id() {
            return Ok(Some(Resolution::new(
                account_id,
                ResolutionStrategy::SubscriptionMetadata,
            )));
        }

        if !subscription.id.is_empty() {
            let found = bounded(
                self.store_timeout,
                "account lookup by subscription",
                self.store.find_account_id_by_subscription_id(&subscription.id),
            )
            .await?;
            if let Some(account_id) = found {
                return Ok(Some(Resolution::new(
                    account_id,
                    ResolutionStrategy::RecordedSubscriptionId,
                )));
            }
        }

        let customer_id = customer_id
            .filter(|c| !c.is_empty())
            .unwrap_or(subscription.customer_id.as_str());
        if !customer_id.is_empty() {
            let found = bounded(
                self.store_timeout,
                "account lookup by customer",
                self.store.find_account_id_by_customer_id(customer_id),
            )
            .await?;
            if let Some(account_id) = found {
                return Ok(Some(Resolution::new(
                    account_id,
                    ResolutionStrategy::RecordedCustomerId,
                )));
            }
        }

        Ok(None)
    }
}
