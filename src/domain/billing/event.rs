//! Event decoding.
//!
//! Verified bytes become an [`EventEnvelope`] (type string + opaque object),
//! which is then narrowed into the [`BillingEvent`] tagged union. Decoding
//! rejects only structurally invalid bytes; unknown event types decode fine
//! and surface as [`BillingEvent::Unhandled`].

use serde::Deserialize;
use serde_json::Value;

use super::stripe_objects::{StripeCheckoutSession, StripeSubscription};
use super::subscription::SubscriptionSnapshot;
use super::webhook_errors::WebhookError;
use crate::domain::foundation::AccountId;

/// Checkout mode that creates a subscription.
const SUBSCRIPTION_MODE: &str = "subscription";

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
    #[serde(default)]
    livemode: bool,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: Value,
}

/// Decoded but not yet interpreted webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    /// Provider event id (evt_...).
    pub id: String,

    /// Provider event type, e.g. `customer.subscription.updated`.
    pub event_type: String,

    /// Whether the event was produced in live mode.
    pub livemode: bool,

    /// The `data.object` payload, always a JSON object.
    pub object: Value,
}

impl EventEnvelope {
    /// Decodes raw, already verified bytes.
    ///
    /// # Errors
    ///
    /// `WebhookError::MalformedEvent` if the bytes are not JSON, a required
    /// field is missing, or `data.object` is not an object.
    pub fn decode(payload: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;

        if !raw.data.object.is_object() {
            return Err(WebhookError::MalformedEvent(
                "data.object is not an object".to_string(),
            ));
        }

        Ok(Self {
            id: raw.id,
            event_type: raw.event_type,
            livemode: raw.livemode,
            object: raw.data.object,
        })
    }

    /// Classifies the event type.
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event_type)
    }
}

/// Which subscription lifecycle notification was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    Created,
    Updated,
    Deleted,
    TrialWillEnd,
}

impl SubscriptionChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::TrialWillEnd => "trial_will_end",
        }
    }
}

/// Event type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckoutSessionCompleted,
    Subscription(SubscriptionChange),
    Unhandled,
}

impl EventKind {
    /// Parses a provider event type string. Never fails.
    pub fn parse(event_type: &str) -> Self {
        match event_type {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::Subscription(SubscriptionChange::Created),
            "customer.subscription.updated" => Self::Subscription(SubscriptionChange::Updated),
            "customer.subscription.deleted" => Self::Subscription(SubscriptionChange::Deleted),
            "customer.subscription.trial_will_end" => {
                Self::Subscription(SubscriptionChange::TrialWillEnd)
            }
            _ => Self::Unhandled,
        }
    }
}

/// Correlation data pulled from a completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompletion {
    pub session_id: Option<String>,
    pub mode: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub supplied_account_id: Option<AccountId>,
}

impl CheckoutCompletion {
    /// Only subscription-mode sessions are reconciled.
    pub fn is_subscription_mode(&self) -> bool {
        self.mode.as_deref() == Some(SUBSCRIPTION_MODE)
    }
}

impl From<StripeCheckoutSession> for CheckoutCompletion {
    fn from(session: StripeCheckoutSession) -> Self {
        let supplied_account_id = session.supplied_account_id();
        Self {
            session_id: session.id,
            mode: session.mode,
            subscription_id: session
                .subscription
                .map(|s| s.id().to_string())
                .filter(|id| !id.trim().is_empty()),
            customer_id: session
                .customer
                .map(|c| c.id().to_string())
                .filter(|id| !id.trim().is_empty()),
            supplied_account_id,
        }
    }
}

/// A decoded event, narrowed to the payload type its discriminant implies.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    CheckoutSessionCompleted(CheckoutCompletion),
    Subscription {
        change: SubscriptionChange,
        snapshot: SubscriptionSnapshot,
    },
    Unhandled {
        event_type: String,
    },
}

impl BillingEvent {
    /// Narrows the envelope's opaque object by event kind.
    ///
    /// # Errors
    ///
    /// `WebhookError::MalformedEvent` if the object does not have the shape
    /// its event type requires.
    pub fn from_envelope(envelope: EventEnvelope) -> Result<Self, WebhookError> {
        match envelope.kind() {
            EventKind::CheckoutSessionCompleted => {
                let session: StripeCheckoutSession = serde_json::from_value(envelope.object)
                    .map_err(|e| {
                        WebhookError::MalformedEvent(format!("invalid checkout session: {}", e))
                    })?;
                Ok(Self::CheckoutSessionCompleted(session.into()))
            }
            EventKind::Subscription(change) => {
                let subscription: StripeSubscription = serde_json::from_value(envelope.object)
                    .map_err(|e| {
                        WebhookError::MalformedEvent(format!("invalid subscription: {}", e))
                    })?;
                Ok(Self::Subscription {
                    change,
                    snapshot: SubscriptionSnapshot::try_from(subscription)?,
                })
            }
            EventKind::Unhandled => Ok(Self::Unhandled {
                event_type: envelope.event_type,
            }),
        }
    }
}
