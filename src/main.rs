//! AnestEasy billing service entry point.
//!
//! Boots the service in four steps: load and validate configuration,
//! connect the Postgres pool (running migrations when configured), wire
//! the adapters into the HTTP state, then serve the axum router with a
//! background sweep task applying due plan changes.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use anesteasy_billing::adapters::http::{auth_middleware, AuthState, BillingAppState};
use anesteasy_billing::adapters::{
    InMemoryEventBus, PagarmeConfig, PagarmeGatewayAdapter, PostgresSubscriptionRepository,
    PostgresTransactionRepository, PostgresWebhookEventRepository, SupabaseConfig,
    SupabaseTokenVerifier,
};
use anesteasy_billing::application::handlers::billing::{
    ApplyDuePlanChangesCommand, ApplyDuePlanChangesHandler,
};
use anesteasy_billing::config::AppConfig;
use anesteasy_billing::domain::billing::PagarmeWebhookVerifier;
use anesteasy_billing::domain::foundation::Timestamp;
use anesteasy_billing::ports::{
    EventPublisher, PaymentGateway, SubscriptionRepository, TokenVerifier, TransactionRepository,
    WebhookEventRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    tracing::info!(
        environment = ?config.server.environment,
        test_mode = config.gateway.is_test_mode(),
        "starting anesteasy-billing"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    // Wire adapters into the shared HTTP state
    let subscription_repository: Arc<dyn SubscriptionRepository> =
        Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let transaction_repository: Arc<dyn TransactionRepository> =
        Arc::new(PostgresTransactionRepository::new(pool.clone()));
    let webhook_repository: Arc<dyn WebhookEventRepository> =
        Arc::new(PostgresWebhookEventRepository::new(pool.clone()));

    let mut pagarme_config = PagarmeConfig::new(config.gateway.pagarme_api_key.clone());
    if let Some(base_url) = &config.gateway.api_base_url {
        pagarme_config = pagarme_config.with_base_url(base_url.clone());
    }
    let payment_gateway: Arc<dyn PaymentGateway> =
        Arc::new(PagarmeGatewayAdapter::new(pagarme_config));

    let event_publisher: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());

    let webhook_verifier = PagarmeWebhookVerifier::new(SecretString::new(
        config.gateway.pagarme_webhook_secret.clone(),
    ));

    let token_verifier: Arc<dyn TokenVerifier> = Arc::new(SupabaseTokenVerifier::new(
        SupabaseConfig::new(config.auth.supabase_jwt_secret.clone())
            .with_audience(config.auth.supabase_audience.clone()),
    ));

    let state = BillingAppState {
        subscription_repository: subscription_repository.clone(),
        transaction_repository,
        webhook_repository: webhook_repository.clone(),
        payment_gateway,
        event_publisher: event_publisher.clone(),
        webhook_verifier,
    };

    spawn_billing_sweep(
        subscription_repository,
        webhook_repository,
        event_publisher,
        Duration::from_secs(config.server.sweep_interval_secs),
    );

    let auth_state: AuthState = token_verifier;
    let app = anesteasy_billing::adapters::http::billing_router()
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                )))
                .layer(CompressionLayer::new())
                .layer(cors_layer(&config)?)
                .layer(axum::middleware::from_fn_with_state(
                    auth_state,
                    auth_middleware,
                )),
        );

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// Production emits JSON lines for log aggregation; development keeps
/// the human-readable format. `RUST_LOG` overrides the configured filter.
fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Build the CORS layer from configured origins.
///
/// No configured origins means same-origin deployment; the layer then
/// allows nothing cross-origin.
fn cors_layer(config: &AppConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let mut origins = Vec::new();
    for origin in config.server.cors_origins_list() {
        origins.push(origin.parse::<HeaderValue>()?);
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

/// Processed webhook records older than this are pruned by the sweep.
const WEBHOOK_RETENTION_DAYS: i64 = 90;

/// Spawn the periodic sweep that applies due deferred plan changes and
/// prunes the webhook idempotency ledger.
///
/// The first tick fires immediately so changes that came due while the
/// service was down are applied on startup.
fn spawn_billing_sweep(
    repository: Arc<dyn SubscriptionRepository>,
    webhook_repository: Arc<dyn WebhookEventRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    interval: Duration,
) {
    let handler = ApplyDuePlanChangesHandler::new(repository, event_publisher);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let now = Timestamp::now();

            match handler.handle(ApplyDuePlanChangesCommand { now }).await {
                Ok(result) if result.applied > 0 || result.failed > 0 => {
                    tracing::info!(
                        applied = result.applied,
                        failed = result.failed,
                        "plan-change sweep completed"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::error!(%error, "plan-change sweep failed");
                }
            }

            let cutoff = now.minus_days(WEBHOOK_RETENTION_DAYS);
            match webhook_repository.delete_before(cutoff).await {
                Ok(pruned) if pruned > 0 => {
                    tracing::info!(pruned, "pruned processed webhook records");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(%error, "webhook ledger pruning failed");
                }
            }
        }
    });
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
