//! HandleSubscriptionWebhookHandler - orchestrates one webhook delivery.
//!
//! verify → decode → dispatch. Authentication and decoding failures end the
//! request before any store access; everything after that is delegated to
//! the [`EventDispatcher`].

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::domain::billing::{BillingEvent, EventEnvelope, WebhookError, WebhookVerifier};
use crate::ports::{AccountStore, PaymentProvider};

use super::dispatch_event::{EventDispatcher, IgnoreReason, WebhookOutcome};
use super::reconcile_plan::PlanReconciler;
use super::resolve_account::SubscriptionResolver;
use super::store_call::DEFAULT_STORE_TIMEOUT;

/// Command to handle a subscription webhook.
#[derive(Debug, Clone)]
pub struct HandleSubscriptionWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Signature header value, if the request carried one.
    pub signature: Option<String>,
}

/// Handler for payment provider subscription webhooks.
pub struct HandleSubscriptionWebhookHandler {
    verifier: WebhookVerifier,
    dispatcher: EventDispatcher,
    require_livemode: bool,
}

impl HandleSubscriptionWebhookHandler {
    pub fn new(
        verifier: WebhookVerifier,
        payment_provider: Arc<dyn PaymentProvider>,
        store: Arc<dyn AccountStore>,
    ) -> Self {
        Self::with_options(verifier, payment_provider, store, DEFAULT_STORE_TIMEOUT, false)
    }

    /// Full constructor: per-call store bound and live-mode filtering.
    pub fn with_options(
        verifier: WebhookVerifier,
        payment_provider: Arc<dyn PaymentProvider>,
        store: Arc<dyn AccountStore>,
        store_timeout: Duration,
        require_livemode: bool,
    ) -> Self {
        let resolver = SubscriptionResolver::new(store.clone()).with_store_timeout(store_timeout);
        let reconciler = PlanReconciler::new(store).with_store_timeout(store_timeout);
        Self {
            verifier,
            dispatcher: EventDispatcher::new(payment_provider, resolver, reconciler),
            require_livemode,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleSubscriptionWebhookCommand,
    ) -> Result<WebhookOutcome, WebhookError> {
        // 1. Authenticate the raw bytes
        self.verifier
            .verify(&cmd.payload, cmd.signature.as_deref())
            .map_err(|e| {
                tracing::warn!(error = %e, "Webhook signature verification failed");
                e
            })?;

        // 2. Decode into the typed event union
        let envelope = EventEnvelope::decode(&cmd.payload).map_err(|e| {
            tracing::warn!(error = %e, "Webhook payload could not be decoded");
            e
        })?;

        let span = tracing::info_span!(
            "subscription_webhook",
            event_id = %envelope.id,
            event_type = %envelope.event_type,
        );

        let event = {
            let _entered = span.enter();

            if self.require_livemode && !envelope.livemode {
                tracing::info!("Ignoring test-mode event");
                return Ok(WebhookOutcome::Ignored(IgnoreReason::TestModeEvent));
            }

            BillingEvent::from_envelope(envelope).map_err(|e| {
                tracing::warn!(error = %e, "Webhook event payload has the wrong shape");
                e
            })?
        };

        // 3. Dispatch
        self.dispatcher.dispatch(event).instrument(span).await
    }
}
