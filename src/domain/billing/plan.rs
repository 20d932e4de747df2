//! Plan tier and entitlement derivation.
//!
//! Both values are pure functions of a subscription snapshot: the plan tier
//! comes from the billing interval, the entitlement from the status.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::subscription::{BillingInterval, SubscriptionStatus};

/// Paid plan tier recorded on the subscription mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    ProMonthly,
    ProYearly,
}

impl Plan {
    /// Maps a billing interval onto a plan tier.
    ///
    /// Intervals other than month/year leave the tier unknown; the status is
    /// still tracked.
    pub fn from_interval(interval: Option<BillingInterval>) -> Option<Self> {
        match interval {
            Some(BillingInterval::Month) => Some(Plan::ProMonthly),
            Some(BillingInterval::Year) => Some(Plan::ProYearly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::ProMonthly => "pro_monthly",
            Plan::ProYearly => "pro_yearly",
        }
    }

    /// Parses a stored plan value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pro_monthly" => Some(Plan::ProMonthly),
            "pro_yearly" => Some(Plan::ProYearly),
            _ => None,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tier an account is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entitlement {
    Free,
    Pro,
}

impl Entitlement {
    /// Derives the entitlement for a subscription status.
    ///
    /// Fails safe: anything not explicitly known-good is `Free`.
    pub fn for_status(status: &SubscriptionStatus) -> Self {
        if status.grants_access() {
            Entitlement::Pro
        } else {
            Entitlement::Free
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Entitlement::Free => "free",
            Entitlement::Pro => "pro",
        }
    }

    /// Parses a stored entitlement value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Entitlement::Free),
            "pro" => Some(Entitlement::Pro),
            _ => None,
        }
    }
}

impl fmt::Display for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
