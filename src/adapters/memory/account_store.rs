//! In-memory Account Store.
//!
//! Same contract as the PostgreSQL adapter: upserts keyed by account id,
//! lookups return the most recently updated match, and accounts are never
//! created by the port itself. Fault toggles let tests drive the failure
//! paths through this one store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{AccountSubscriptionRecord, Entitlement};
use crate::domain::foundation::{AccountId, DomainError};
use crate::ports::AccountStore;

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, Entitlement>,
    subscriptions: HashMap<AccountId, AccountSubscriptionRecord>,
    writes: u64,
    lookups: Vec<String>,
}

impl Tables {
    fn latest_by<F>(&self, matches: F) -> Option<AccountId>
    where
        F: Fn(&AccountSubscriptionRecord) -> bool,
    {
        self.subscriptions
            .values()
            .filter(|record| matches(record))
            .max_by_key(|record| record.updated_at)
            .map(|record| record.account_id.clone())
    }

    fn seed_record(&mut self, record: AccountSubscriptionRecord) {
        self.accounts
            .entry(record.account_id.clone())
            .or_insert(Entitlement::Free);
        self.subscriptions.insert(record.account_id.clone(), record);
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    fail_lookups: bool,
    fail_upsert: bool,
    fail_entitlement: bool,
    latency: Option<Duration>,
}

/// Account Store backed by process memory.
#[derive(Default)]
pub struct InMemoryAccountStore {
    tables: RwLock<Tables>,
    faults: Faults,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Builders
    // ════════════════════════════════════════════════════════════════════════

    /// Starts with an account on the free plan.
    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.tables
            .get_mut()
            .accounts
            .entry(account_id)
            .or_insert(Entitlement::Free);
        self
    }

    /// Starts with a mirror row (and its account).
    pub fn with_record(mut self, record: AccountSubscriptionRecord) -> Self {
        self.tables.get_mut().seed_record(record);
        self
    }

    /// Both lookups fail with a database error.
    pub fn failing_lookups(mut self) -> Self {
        self.faults.fail_lookups = true;
        self
    }

    /// Upserts fail with a database error.
    pub fn failing_upsert(mut self) -> Self {
        self.faults.fail_upsert = true;
        self
    }

    /// Entitlement updates fail with a database error.
    pub fn failing_entitlement(mut self) -> Self {
        self.faults.fail_entitlement = true;
        self
    }

    /// Every port call waits `latency` before touching the tables.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.faults.latency = Some(latency);
        self
    }

    // ════════════════════════════════════════════════════════════════════════
    // Seeding and inspection
    // ════════════════════════════════════════════════════════════════════════

    /// Creates an account on the free plan, as the rest of the product would.
    pub async fn insert_account(&self, account_id: AccountId) {
        self.tables
            .write()
            .await
            .accounts
            .entry(account_id)
            .or_insert(Entitlement::Free);
    }

    /// Seeds a mirror row without counting it as a write.
    pub async fn insert_subscription_record(&self, record: AccountSubscriptionRecord) {
        self.tables.write().await.seed_record(record);
    }

    /// Current entitlement, or `None` for an unknown account.
    pub async fn entitlement(&self, account_id: &AccountId) -> Option<Entitlement> {
        self.tables.read().await.accounts.get(account_id).copied()
    }

    /// Current mirror row for the account.
    pub async fn subscription_record(
        &self,
        account_id: &AccountId,
    ) -> Option<AccountSubscriptionRecord> {
        self.tables
            .read()
            .await
            .subscriptions
            .get(account_id)
            .cloned()
    }

    /// Number of mirror rows.
    pub async fn record_count(&self) -> usize {
        self.tables.read().await.subscriptions.len()
    }

    /// Number of successful writes through the port.
    pub async fn write_count(&self) -> u64 {
        self.tables.read().await.writes
    }

    /// Lookups performed, as `"subscription:<id>"` / `"customer:<id>"`.
    pub async fn lookups(&self) -> Vec<String> {
        self.tables.read().await.lookups.clone()
    }

    async fn delay(&self) {
        if let Some(latency) = self.faults.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_account_id_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<AccountId>, DomainError> {
        self.delay().await;
        let mut tables = self.tables.write().await;
        tables.lookups.push(format!("subscription:{}", subscription_id));
        if self.faults.fail_lookups {
            return Err(DomainError::database("lookup failed"));
        }
        Ok(tables.latest_by(|r| r.provider_subscription_id == subscription_id))
    }

    async fn find_account_id_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<AccountId>, DomainError> {
        self.delay().await;
        let mut tables = self.tables.write().await;
        tables.lookups.push(format!("customer:{}", customer_id));
        if self.faults.fail_lookups {
            return Err(DomainError::database("lookup failed"));
        }
        Ok(tables.latest_by(|r| r.provider_customer_id == customer_id))
    }

    async fn upsert_subscription_record(
        &self,
        record: &AccountSubscriptionRecord,
    ) -> Result<(), DomainError> {
        self.delay().await;
        if self.faults.fail_upsert {
            return Err(DomainError::database("upsert failed"));
        }
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&record.account_id) {
            return Err(DomainError::account_not_found(&record.account_id));
        }
        tables
            .subscriptions
            .insert(record.account_id.clone(), record.clone());
        tables.writes += 1;
        Ok(())
    }

    async fn update_entitlement(
        &self,
        account_id: &AccountId,
        entitlement: Entitlement,
    ) -> Result<(), DomainError> {
        self.delay().await;
        if self.faults.fail_entitlement {
            return Err(DomainError::database("update failed"));
        }
        let mut tables = self.tables.write().await;
        match tables.accounts.get_mut(account_id) {
            Some(current) => *current = entitlement,
            None => return Err(DomainError::account_not_found(account_id)),
        }
        tables.writes += 1;
        Ok(())
    }
}
