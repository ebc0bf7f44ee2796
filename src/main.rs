//! EV Marketplace server binary.
//!
//! Loads configuration from the environment, wires the PostgreSQL, Stripe
//! and Resend adapters behind the application handlers, runs the expiry
//! sweep and serves the HTTP API until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use ev_marketplace::adapters::auth::{JwtConfig, JwtSessionValidator};
use ev_marketplace::adapters::email::{LoggingNotifier, ResendNotifier};
use ev_marketplace::adapters::events::InMemoryEventBus;
use ev_marketplace::adapters::http::{app_router, AppState};
use ev_marketplace::adapters::postgres::{
    PostgresContractRepository, PostgresListingRepository, PostgresPurchaseRequestRepository,
    PostgresUserDirectory, PostgresVipPlanRepository, PostgresVipPurchaseRepository,
};
use ev_marketplace::adapters::stripe::{StripeConfig, StripeGateway};
use ev_marketplace::application::handlers::listing::ListingSaleStatusSync;
use ev_marketplace::application::handlers::purchase_request::ExpirePurchaseRequestsHandler;
use ev_marketplace::application::handlers::vip::ExpireVipListingsHandler;
use ev_marketplace::config::{AppConfig, ServerConfig};
use ev_marketplace::domain::contract::CONTRACT_SIGNED_EVENT;
use ev_marketplace::domain::foundation::Timestamp;
use ev_marketplace::ports::{EventSubscriber, ListingRepository, Notifier, SessionValidator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration and logging
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;
    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        "Configuration loaded"
    );

    // 2. Database
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // 3. Adapters
    let listings: Arc<dyn ListingRepository> =
        Arc::new(PostgresListingRepository::new(pool.clone()));
    let bus = Arc::new(InMemoryEventBus::without_history());
    bus.subscribe(
        CONTRACT_SIGNED_EVENT,
        Arc::new(ListingSaleStatusSync::new(listings.clone())),
    );

    let gateway = StripeGateway::new(
        StripeConfig::new(
            config.payment.stripe_api_key.clone(),
            config.payment.stripe_webhook_secret.clone(),
        )
        .with_require_livemode(config.payment.require_livemode),
    );

    let notifier: Arc<dyn Notifier> = if config.email.uses_resend() {
        Arc::new(ResendNotifier::new(
            config.email.resend_api_key.clone(),
            config.email.from_header(),
        ))
    } else {
        tracing::warn!("No Resend API key configured; emails will only be logged");
        Arc::new(LoggingNotifier::new())
    };

    let validator: Arc<dyn SessionValidator> = Arc::new(JwtSessionValidator::new(JwtConfig::new(
        config.auth.jwt_secret.clone(),
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
    )));

    let state = app_state(
        &pool,
        listings.clone(),
        Arc::new(gateway),
        notifier,
        bus.clone(),
        &config,
    );

    // 4. Background expiry
    let sweep = spawn_expiry_sweep(
        ExpirePurchaseRequestsHandler::new(state.purchase_requests.clone()),
        ExpireVipListingsHandler::new(listings, bus),
        config.contract.expiry_sweep_interval(),
    );

    // 5. Serve
    let addr = config.server.socket_addr()?;
    let app = app_router(state, validator, &config.server);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 6. Shutdown
    sweep.abort();
    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

fn app_state(
    pool: &PgPool,
    listings: Arc<dyn ListingRepository>,
    gateway: Arc<StripeGateway>,
    notifier: Arc<dyn Notifier>,
    bus: Arc<InMemoryEventBus>,
    config: &AppConfig,
) -> AppState {
    AppState {
        contracts: Arc::new(PostgresContractRepository::new(pool.clone())),
        purchase_requests: Arc::new(PostgresPurchaseRequestRepository::new(pool.clone())),
        listings,
        vip_plans: Arc::new(PostgresVipPlanRepository::new(pool.clone())),
        vip_purchases: Arc::new(PostgresVipPurchaseRepository::new(pool.clone())),
        users: Arc::new(PostgresUserDirectory::new(pool.clone())),
        payment_gateway: gateway,
        notifier,
        event_publisher: bus,
        otp_policy: config.contract.otp_policy(),
        vip_settings: config.payment.to_vip_settings(),
        purchase_request_ttl_days: config.contract.purchase_request_ttl_days,
    }
}

/// Expires overdue purchase requests and lapsed VIP listings on a fixed interval.
fn spawn_expiry_sweep(
    requests: ExpirePurchaseRequestsHandler,
    vip: ExpireVipListingsHandler,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let now = Timestamp::now();

            match requests.handle(now).await {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired, "Purchase requests expired"),
                Err(e) => tracing::warn!(error = %e, "Purchase request sweep failed"),
            }
            if let Err(e) = vip.handle(now).await {
                tracing::warn!(error = %e, "VIP expiry sweep failed");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
