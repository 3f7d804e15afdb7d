use shop_api::config::AppConfig;
use shop_api::loyalty::LoyaltyLedger;
use shop_api::notifications::notifier_from_config;
use shop_api::{create_router, db, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // RUST_LOG controls verbosity, defaulting to info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Shop API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let ledger = LoyaltyLedger::new(config.loyalty.clone()).expect("Invalid loyalty configuration");
    let notifier = notifier_from_config(&config.notifications);
    if config.notifications.webhook_url.is_none() {
        tracing::warn!("NOTIFICATION_WEBHOOK_URL not set, order confirmations will only be logged");
    }
    tracing::info!("Order confirmations delivered via {}", notifier.channel());

    let app = create_router(AppState::new(db_pool, ledger, notifier));

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Shop API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
