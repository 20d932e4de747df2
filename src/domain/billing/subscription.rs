//! Subscription snapshot as reported by the payment provider.
//!
//! A snapshot is read-only input: this service never owns or mutates it,
//! it only mirrors it into the Account Store.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::AccountId;

/// Metadata keys that may carry the owning account id, in lookup order.
pub const ACCOUNT_METADATA_KEYS: [&str; 2] = ["account_id", "user_id"];

/// Subscription lifecycle status from the payment provider.
///
/// Unrecognised statuses are preserved verbatim in `Other` so the mirror
/// record stays faithful, and they never grant access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
    Other(String),
}

impl SubscriptionStatus {
    /// Parses the provider's status string.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "paused" => Self::Paused,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the provider's status string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Paused => "paused",
            Self::Other(s) => s,
        }
    }

    /// Only `active` and `trialing` are known-good; everything else,
    /// including statuses not seen before, is non-entitled.
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

impl From<String> for SubscriptionStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recurring billing interval of the subscribed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Day,
    Week,
    Month,
    Year,
}

impl BillingInterval {
    /// Parses the provider's interval string; unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

/// Point-in-time view of a billing subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    /// Provider's subscription id (sub_...).
    pub id: String,

    /// Provider's customer id (cus_...).
    pub customer_id: String,

    /// Current lifecycle status.
    pub status: SubscriptionStatus,

    /// End of the current billing period, when the provider reports one.
    pub current_period_end: Option<DateTime<Utc>>,

    /// Whether the subscription ends at the end of the current period.
    pub cancel_at_period_end: bool,

    /// Billing interval of the subscribed price, when recognisable.
    pub billing_interval: Option<BillingInterval>,

    /// Key/value pairs attached when the subscription was created.
    pub metadata: HashMap<String, String>,
}

impl SubscriptionSnapshot {
    /// Returns the account correlation id embedded in metadata, if any.
    pub fn metadata_account_id(&self) -> Option<AccountId> {
        account_id_from_metadata(&self.metadata)
    }
}

/// Looks up the first non-blank account correlation key in a metadata map.
pub(crate) fn account_id_from_metadata(metadata: &HashMap<String, String>) -> Option<AccountId> {
    ACCOUNT_METADATA_KEYS
        .iter()
        .find_map(|key| AccountId::parse_optional(metadata.get(*key).map(String::as_str)))
}

/// Builder for creating test SubscriptionSnapshot instances.
#[cfg(test)]
pub struct SubscriptionSnapshotBuilder {
    snapshot: SubscriptionSnapshot,
}

#[cfg(test)]
impl Default for SubscriptionSnapshotBuilder {
    fn default() -> Self {
        Self {
            snapshot: SubscriptionSnapshot {
                id: "sub_123".to_string(),
                customer_id: "cus_1".to_string(),
                status: SubscriptionStatus::Active,
                current_period_end: DateTime::from_timestamp(1_735_689_600, 0),
                cancel_at_period_end: false,
                billing_interval: Some(BillingInterval::Month),
                metadata: HashMap::new(),
            },
        }
    }
}

#[cfg(test)]
impl SubscriptionSnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.snapshot.id = id.into();
        self
    }

    pub fn customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.snapshot.customer_id = customer_id.into();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.snapshot.status = SubscriptionStatus::parse(status);
        self
    }

    pub fn interval(mut self, interval: Option<BillingInterval>) -> Self {
        self.snapshot.billing_interval = interval;
        self
    }

    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.snapshot
            .metadata
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> SubscriptionSnapshot {
        self.snapshot
    }
}
