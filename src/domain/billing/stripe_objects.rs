//! Stripe object shapes carried in `data.object`.
//!
//! Only fields relevant to reconciliation are captured; everything else in
//! Stripe's schema is ignored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::subscription::{
    account_id_from_metadata, BillingInterval, SubscriptionSnapshot, SubscriptionStatus,
};
use super::webhook_errors::WebhookError;
use crate::domain::foundation::AccountId;

/// A reference that Stripe renders either as a bare id or as the expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    /// Returns the referenced object's id.
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

/// Generic Stripe list wrapper (`{"object": "list", "data": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeRecurring {
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub recurring: Option<StripeRecurring>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePlan {
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: Option<StripePrice>,
    /// Newer API versions report the period per item instead of per subscription.
    pub current_period_end: Option<i64>,
}

/// Stripe subscription object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: Expandable,
    pub status: String,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub items: Option<StripeList<StripeSubscriptionItem>>,
    /// Legacy single-plan field, still sent by older API versions.
    pub plan: Option<StripePlan>,
    pub metadata: Option<HashMap<String, String>>,
}

impl StripeSubscription {
    fn first_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.as_ref().and_then(|items| items.data.first())
    }

    /// Interval from the first item's recurring price, falling back to `plan.interval`.
    fn interval(&self) -> Option<&str> {
        self.first_item()
            .and_then(|item| item.price.as_ref())
            .and_then(|price| price.recurring.as_ref())
            .and_then(|recurring| recurring.interval.as_deref())
            .or_else(|| self.plan.as_ref().and_then(|plan| plan.interval.as_deref()))
    }

    fn period_end_timestamp(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.first_item().and_then(|item| item.current_period_end))
    }
}

impl TryFrom<StripeSubscription> for SubscriptionSnapshot {
    type Error = WebhookError;

    fn try_from(sub: StripeSubscription) -> Result<Self, Self::Error> {
        let current_period_end = match sub.period_end_timestamp() {
            Some(ts) => Some(DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
                WebhookError::MalformedEvent(format!("current_period_end out of range: {}", ts))
            })?),
            None => None,
        };
        let billing_interval = sub.interval().and_then(BillingInterval::parse);

        Ok(SubscriptionSnapshot {
            customer_id: sub.customer.id().to_string(),
            status: SubscriptionStatus::parse(&sub.status),
            current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            billing_interval,
            metadata: sub.metadata.unwrap_or_default(),
            id: sub.id,
        })
    }
}

/// Stripe checkout session object.
///
/// Every field is optional: a completed session without a subscription is
/// acknowledged rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub mode: Option<String>,
    pub subscription: Option<Expandable>,
    pub customer: Option<Expandable>,
    pub client_reference_id: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

impl StripeCheckoutSession {
    /// Account id the checkout creator attached: `client_reference_id`, then metadata.
    pub fn supplied_account_id(&self) -> Option<AccountId> {
        AccountId::parse_optional(self.client_reference_id.as_deref())
            .or_else(|| self.metadata.as_ref().and_then(account_id_from_metadata))
    }
}
