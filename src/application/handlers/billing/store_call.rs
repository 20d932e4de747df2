//! Time-bounded Account Store calls.

use std::future::Future;
use std::time::Duration;

use crate::domain::billing::WebhookError;
use crate::domain::foundation::DomainError;

/// Default bound for a single Account Store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a store call under `limit`.
///
/// Elapsed → `WebhookError::Timeout(operation)`; store errors → `Persistence`.
/// Nothing is retried here; a server error lets the provider redeliver.
pub(crate) async fn bounded<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, WebhookError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| WebhookError::Timeout(operation))?
        .map_err(WebhookError::from)
}
