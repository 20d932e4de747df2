//! EventDispatcher - routes a decoded event to its reconciliation path.

use std::sync::Arc;

use crate::domain::billing::{
    BillingEvent, CheckoutCompletion, Entitlement, Plan, SubscriptionChange, SubscriptionSnapshot,
    WebhookError,
};
use crate::domain::foundation::AccountId;
use crate::ports::PaymentProvider;

use super::reconcile_plan::PlanReconciler;
use super::resolve_account::{ResolutionStrategy, SubscriptionResolver};

/// Why an acknowledged event caused no writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Event type this service does not handle.
    UnhandledEventType(String),
    /// Checkout session for a one-time payment.
    NotSubscriptionMode,
    /// Checkout session without a subscription id.
    MissingSubscriptionId,
    /// Test-mode event while only live events are accepted.
    TestModeEvent,
}

/// Successful outcome of a webhook delivery. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Subscription mirrored and entitlement written.
    Reconciled {
        account_id: AccountId,
        strategy: ResolutionStrategy,
        plan: Option<Plan>,
        entitlement: Entitlement,
    },
    /// Well-formed event whose account could not be determined.
    Unresolved { subscription_id: String },
    /// Nothing to do.
    Ignored(IgnoreReason),
}

/// Routes events to the resolver and reconciler.
pub struct EventDispatcher {
    payment_provider: Arc<dyn PaymentProvider>,
    resolver: SubscriptionResolver,
    reconciler: PlanReconciler,
}

impl EventDispatcher {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        resolver: SubscriptionResolver,
        reconciler: PlanReconciler,
    ) -> Self {
        Self {
            payment_provider,
            resolver,
            reconciler,
        }
    }

    /// Handles one event.
    ///
    /// # Errors
    ///
    /// `Provider`, `Timeout` or `Persistence` when an external call fails.
    pub async fn dispatch(&self, event: BillingEvent) -> Result<WebhookOutcome, WebhookError> {
        match event {
            BillingEvent::CheckoutSessionCompleted(completion) => {
                self.handle_checkout_completed(completion).await
            }
            BillingEvent::Subscription { change, snapshot } => {
                self.handle_subscription_change(change, snapshot).await
            }
            BillingEvent::Unhandled { event_type } => {
                tracing::info!(event_type = %event_type, "Ignoring unhandled event type");
                Ok(WebhookOutcome::Ignored(IgnoreReason::UnhandledEventType(
                    event_type,
                )))
            }
        }
    }

    async fn handle_checkout_completed(
        &self,
        completion: CheckoutCompletion,
    ) -> Result<WebhookOutcome, WebhookError> {
        let session_id = completion.session_id.as_deref().unwrap_or("unknown");

        if !completion.is_subscription_mode() {
            tracing::info!(
                session_id = %session_id,
                mode = completion.mode.as_deref().unwrap_or("none"),
                "Ignoring non-subscription checkout session"
            );
            return Ok(WebhookOutcome::Ignored(IgnoreReason::NotSubscriptionMode));
        }

        let Some(subscription_id) = completion.subscription_id.as_deref() else {
            tracing::warn!(
                session_id = %session_id,
                "Checkout session completed without a subscription id"
            );
            return Ok(WebhookOutcome::Ignored(IgnoreReason::MissingSubscriptionId));
        };

        let snapshot = self
            .payment_provider
            .fetch_subscription(subscription_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    subscription_id = %subscription_id,
                    error = %e,
                    "Failed to fetch subscription for checkout session"
                );
                WebhookError::from(e)
            })?;

        self.reconcile(
            snapshot,
            completion.supplied_account_id.as_ref(),
            completion.customer_id.as_deref(),
        )
        .await
    }

    async fn handle_subscription_change(
        &self,
        change: SubscriptionChange,
        snapshot: SubscriptionSnapshot,
    ) -> Result<WebhookOutcome, WebhookError> {
        tracing::debug!(
            subscription_id = %snapshot.id,
            change = change.as_str(),
            status = %snapshot.status,
            "Subscription change received"
        );
        self.reconcile(snapshot, None, None).await
    }

    async fn reconcile(
        &self,
        snapshot: SubscriptionSnapshot,
        supplied_account_id: Option<&AccountId>,
        customer_id: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookError> {
        let resolution = self
            .resolver
            .resolve(&snapshot, supplied_account_id, customer_id)
            .await?;

        let Some(resolution) = resolution else {
            tracing::info!(
                subscription_id = %snapshot.id,
                customer_id = %snapshot.customer_id,
                "No account found for subscription; acknowledging without changes"
            );
            return Ok(WebhookOutcome::Unresolved {
                subscription_id: snapshot.id,
            });
        };

        let result = self
            .reconciler
            .reconcile(&snapshot, &resolution.account_id)
            .await?;

        tracing::info!(
            account_id = %result.account_id,
            subscription_id = %snapshot.id,
            strategy = %resolution.strategy,
            entitlement = %result.entitlement,
            "Subscription reconciled"
        );

        Ok(WebhookOutcome::Reconciled {
            account_id: result.account_id,
            strategy: resolution.strategy,
            plan: result.plan,
            entitlement: result.entitlement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAccountStore;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::application::handlers::billing::test_support::account;
    use crate::domain::billing::{AccountSubscriptionRecord, SubscriptionSnapshotBuilder};
    use crate::ports::PaymentError;
    use chrono::Utc;

    struct Fixture {
        store: Arc<InMemoryAccountStore>,
        provider: MockPaymentProvider,
        dispatcher: EventDispatcher,
    }

    fn fixture(store: InMemoryAccountStore) -> Fixture {
        let store = Arc::new(store);
        let provider = MockPaymentProvider::new();
        let dispatcher = EventDispatcher::new(
            Arc::new(provider.clone()),
            SubscriptionResolver::new(store.clone()),
            PlanReconciler::new(store.clone()),
        );
        Fixture {
            store,
            provider,
            dispatcher,
        }
    }

    fn checkout(mode: &str, subscription_id: Option<&str>, account_id: Option<&str>) -> BillingEvent {
        BillingEvent::CheckoutSessionCompleted(CheckoutCompletion {
            session_id: Some("cs_1".to_string()),
            mode: Some(mode.to_string()),
            subscription_id: subscription_id.map(str::to_string),
            customer_id: Some("cus_1".to_string()),
            supplied_account_id: account_id.map(account),
        })
    }

    fn subscription_event(snapshot: SubscriptionSnapshot) -> BillingEvent {
        BillingEvent::Subscription {
            change: SubscriptionChange::Updated,
            snapshot,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Checkout Session Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn checkout_fetches_subscription_and_reconciles() {
        let f = fixture(InMemoryAccountStore::new().with_account(account("acc_1")));
        f.provider
            .add_subscription(SubscriptionSnapshotBuilder::new().id("sub_9").build());

        let outcome = f
            .dispatcher
            .dispatch(checkout("subscription", Some("sub_9"), Some("acc_1")))
            .await
            .unwrap();

        assert_eq!(f.provider.fetched(), vec!["sub_9".to_string()]);
        match outcome {
            WebhookOutcome::Reconciled {
                account_id,
                strategy,
                entitlement,
                ..
            } => {
                assert_eq!(account_id.as_str(), "acc_1");
                assert_eq!(strategy, ResolutionStrategy::SuppliedAccountId);
                assert_eq!(entitlement, Entitlement::Pro);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(f.store.entitlement(&account("acc_1")).await, Some(Entitlement::Pro));
    }

    #[tokio::test]
    async fn checkout_payment_mode_is_noop() {
        let f = fixture(InMemoryAccountStore::new().with_account(account("acc_1")));

        let outcome = f
            .dispatcher
            .dispatch(checkout("payment", Some("sub_9"), Some("acc_1")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Ignored(IgnoreReason::NotSubscriptionMode)
        );
        assert_eq!(f.provider.fetch_count(), 0);
        assert_eq!(f.store.write_count().await, 0);
    }

    #[tokio::test]
    async fn checkout_without_subscription_id_is_noop() {
        let f = fixture(InMemoryAccountStore::new().with_account(account("acc_1")));

        let outcome = f
            .dispatcher
            .dispatch(checkout("subscription", None, Some("acc_1")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Ignored(IgnoreReason::MissingSubscriptionId)
        );
        assert_eq!(f.provider.fetch_count(), 0);
        assert_eq!(f.store.write_count().await, 0);
    }

    #[tokio::test]
    async fn checkout_fetch_failure_is_provider_error() {
        let f = fixture(InMemoryAccountStore::new().with_account(account("acc_1")));
        f.provider.set_error(PaymentError::network("connection reset"));

        let result = f
            .dispatcher
            .dispatch(checkout("subscription", Some("sub_9"), Some("acc_1")))
            .await;

        assert!(matches!(result, Err(WebhookError::Provider(_))));
        assert_eq!(f.store.write_count().await, 0);
    }

    #[tokio::test]
    async fn checkout_for_unknown_subscription_is_provider_error() {
        let f = fixture(InMemoryAccountStore::new().with_account(account("acc_1")));

        let result = f
            .dispatcher
            .dispatch(checkout("subscription", Some("sub_missing"), Some("acc_1")))
            .await;

        assert!(matches!(result, Err(WebhookError::Provider(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Event Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_event_reconciles_without_fetch() {
        let f = fixture(InMemoryAccountStore::new().with_account(account("acc_1")));
        let snapshot = SubscriptionSnapshotBuilder::new()
            .metadata("account_id", "acc_1")
            .status("past_due")
            .build();

        let outcome = f.dispatcher.dispatch(subscription_event(snapshot)).await.unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::Reconciled {
                entitlement: Entitlement::Free,
                ..
            }
        ));
        assert_eq!(f.provider.fetch_count(), 0);
    }

    #[tokio::test]
    async fn unresolvable_subscription_is_acknowledged_without_writes() {
        let f = fixture(InMemoryAccountStore::new().with_account(account("acc_1")));
        let snapshot = SubscriptionSnapshotBuilder::new()
            .id("sub_orphan")
            .customer_id("cus_orphan")
            .build();

        let outcome = f.dispatcher.dispatch(subscription_event(snapshot)).await.unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Unresolved {
                subscription_id: "sub_orphan".to_string()
            }
        );
        assert_eq!(f.store.write_count().await, 0);
    }

    #[tokio::test]
    async fn recorded_customer_resolves_plan_swap() {
        let prior = AccountSubscriptionRecord::from_snapshot(
            account("acc_9"),
            &SubscriptionSnapshotBuilder::new().id("sub_old").build(),
            Utc::now(),
        );
        let f = fixture(InMemoryAccountStore::new().with_record(prior));
        let snapshot = SubscriptionSnapshotBuilder::new().id("sub_new").build();

        let outcome = f.dispatcher.dispatch(subscription_event(snapshot)).await.unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::Reconciled {
                strategy: ResolutionStrategy::RecordedCustomerId,
                ..
            }
        ));
        assert_eq!(
            f.store.subscription_record(&account("acc_9")).await.unwrap().provider_subscription_id,
            "sub_new"
        );
    }

    #[tokio::test]
    async fn persistence_failure_propagates() {
        let f = fixture(InMemoryAccountStore::new().with_account(account("acc_1")).failing_upsert());
        let snapshot = SubscriptionSnapshotBuilder::new()
            .metadata("account_id", "acc_1")
            .build();

        let result = f.dispatcher.dispatch(subscription_event(snapshot)).await;

        assert!(matches!(result, Err(WebhookError::Persistence(_))));
    }

    #[tokio::test]
    async fn unhandled_event_is_ignored() {
        let f = fixture(InMemoryAccountStore::new());

        let outcome = f
            .dispatcher
            .dispatch(BillingEvent::Unhandled {
                event_type: "invoice.paid".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Ignored(IgnoreReason::UnhandledEventType(
                "invoice.paid".to_string()
            ))
        );
    }
}
