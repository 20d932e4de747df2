//! Mock payment provider for testing and local runs.
//!
//! Serves pre-configured subscription snapshots, supports error injection
//! and records every fetch for assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::billing::SubscriptionSnapshot;
use crate::ports::{PaymentError, PaymentProvider};

/// Mock payment provider.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.add_subscription(snapshot);
/// mock.set_error(PaymentError::network("connection reset"));
///
/// assert_eq!(mock.fetch_count(), 0);
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Pre-configured subscriptions by ID.
    subscriptions: HashMap<String, SubscriptionSnapshot>,

    /// Error to return on next call.
    next_error: Option<PaymentError>,

    /// Error returned on every call until cleared.
    persistent_error: Option<PaymentError>,

    /// Subscription ids fetched, in call order.
    fetched: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a new mock provider with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Add a subscription to the "provider".
    pub fn add_subscription(&self, subscription: SubscriptionSnapshot) {
        let id = subscription.id.clone();
        self.state().subscriptions.insert(id, subscription);
    }

    /// Set an error to return on the next fetch only.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Fail every fetch with `error` until `clear_errors`.
    pub fn fail_always(&self, error: PaymentError) {
        self.state().persistent_error = Some(error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.persistent_error = None;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Subscription ids fetched so far.
    pub fn fetched(&self) -> Vec<String> {
        self.state().fetched.clone()
    }

    /// Number of fetches performed.
    pub fn fetch_count(&self) -> usize {
        self.state().fetched.len()
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        let mut state = self.state();
        state.fetched.push(subscription_id.to_string());

        if let Some(error) = state.persistent_error.clone() {
            return Err(error);
        }
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        state
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found(&format!("Subscription {}", subscription_id)))
    }
}
