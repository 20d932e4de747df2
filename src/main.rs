//! Entitlement Sync service binary
//!
//! - `POST /webhooks/stripe` - Stripe subscription webhooks
//! - `GET /health` - Liveness probe

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use entitlement_sync::adapters::http::{app_router, WebhookAppState};
use entitlement_sync::adapters::{PostgresAccountStore, StripeConfig, StripePaymentAdapter};
use entitlement_sync::application::HandleSubscriptionWebhookHandler;
use entitlement_sync::config::AppConfig;
use entitlement_sync::domain::billing::WebhookVerifier;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        environment = ?config.server.environment,
        "Configuration loaded"
    );

    let state = build_state(&config).await?;
    let app = app_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wires the webhook handler, or an unconfigured state when credentials are
/// missing so the endpoint fails closed.
async fn build_state(config: &AppConfig) -> Result<WebhookAppState, BoxError> {
    let missing = config.missing_credentials();
    let (Some(api_key), Some(webhook_secret), Some(database_url)) = (
        config.payment.stripe_api_key(),
        config.payment.stripe_webhook_secret(),
        config.database.url(),
    ) else {
        tracing::error!(
            missing = ?missing,
            "Required credentials missing; webhook endpoint will reject all deliveries"
        );
        return Ok(WebhookAppState::unconfigured(
            missing.into_iter().map(str::to_string).collect(),
        ));
    };

    let db = &config.database;
    let pool = PgPoolOptions::new()
        .min_connections(db.min_connections)
        .max_connections(db.max_connections)
        .acquire_timeout(db.acquire_timeout())
        .idle_timeout(db.idle_timeout())
        .max_lifetime(db.max_lifetime())
        .connect_lazy(database_url)?;

    if db.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let stripe = StripePaymentAdapter::new(
        StripeConfig::new(api_key)
            .with_base_url(config.payment.api_base_url.clone())
            .with_request_timeout(config.payment.request_timeout()),
    )?;

    if config.payment.is_test_mode() {
        tracing::warn!("Using Stripe test mode API key");
    }

    let verifier = WebhookVerifier::new(webhook_secret)
        .with_tolerance_secs(config.payment.signature_tolerance_secs);

    let handler = HandleSubscriptionWebhookHandler::with_options(
        verifier,
        Arc::new(stripe),
        Arc::new(PostgresAccountStore::new(pool)),
        db.statement_timeout(),
        config.payment.require_livemode,
    );

    Ok(WebhookAppState::configured(handler))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
