//! PostgreSQL implementation of AccountStore.
//!
//! `account_subscriptions` holds one mirror row per account (primary key
//! `account_id`); `accounts.plan` holds the entitlement. Accounts are owned
//! by the rest of the product and are never inserted here.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::{AccountSubscriptionRecord, Entitlement};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::AccountStore;

/// Foreign key from `account_subscriptions.account_id` to `accounts.id`.
const ACCOUNT_FK_CONSTRAINT: &str = "account_subscriptions_account_id_fkey";

/// PostgreSQL implementation of the AccountStore port.
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    /// Creates a new PostgresAccountStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_latest_account_id(
        &self,
        sql: &str,
        provider_id: &str,
    ) -> Result<Option<AccountId>, DomainError> {
        let account_id: Option<String> = sqlx::query_scalar(sql)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to look up account: {}", e),
                )
            })?;

        account_id
            .map(|id| {
                AccountId::new(id).map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Invalid account_id: {}", e))
                })
            })
            .transpose()
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn find_account_id_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<AccountId>, DomainError> {
        self.find_latest_account_id(
            r#"
            SELECT account_id
            FROM account_subscriptions
            WHERE provider_subscription_id = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
            subscription_id,
        )
        .await
    }

    async fn find_account_id_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<AccountId>, DomainError> {
        self.find_latest_account_id(
            r#"
            SELECT account_id
            FROM account_subscriptions
            WHERE provider_customer_id = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
            customer_id,
        )
        .await
    }

    async fn upsert_subscription_record(
        &self,
        record: &AccountSubscriptionRecord,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO account_subscriptions (
                account_id, provider_customer_id, provider_subscription_id, status,
                plan, current_period_end, cancel_at_period_end, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (account_id) DO UPDATE SET
                provider_customer_id = EXCLUDED.provider_customer_id,
                provider_subscription_id = EXCLUDED.provider_subscription_id,
                status = EXCLUDED.status,
                plan = EXCLUDED.plan,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.account_id.as_str())
        .bind(&record.provider_customer_id)
        .bind(&record.provider_subscription_id)
        .bind(record.status.as_str())
        .bind(record.plan.map(|p| p.as_str()))
        .bind(record.current_period_end)
        .bind(record.cancel_at_period_end)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(ACCOUNT_FK_CONSTRAINT) {
                    return DomainError::account_not_found(&record.account_id);
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to upsert subscription record: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update_entitlement(
        &self,
        account_id: &AccountId,
        entitlement: Entitlement,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                plan = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(account_id.as_str())
        .bind(entitlement.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update entitlement: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::account_not_found(account_id));
        }

        Ok(())
    }
}
