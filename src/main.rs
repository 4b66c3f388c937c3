use rusty_library_loans::{
    adapters::{
        SystemClock, memory::InMemoryEntityStore, mock::NotificationService as MockNotifier,
        postgres::PostgresEntityStore, seed::load_seed_data,
    },
    api::{handlers::AppState, router::create_router},
    application::{ServiceDependencies, loan::run_reminder_scheduler},
    config::AppConfig,
    ports::{EntityStore, Notifier},
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_library_loans=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Select the entity store
    let entity_store: Arc<dyn EntityStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Using PostgreSQL entity store");

            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            Arc::new(PostgresEntityStore::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory entity store");
            Arc::new(InMemoryEntityStore::new())
        }
    };

    // Seed an empty store
    load_seed_data(entity_store.as_ref(), &config.seed_data_dir)
        .await
        .expect("Failed to load seed data");

    // Create service dependencies
    let service_deps = ServiceDependencies::new(entity_store, Arc::new(SystemClock));

    // Start the reminder scheduler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let notifier: Arc<dyn Notifier> = Arc::new(MockNotifier::new());
    let scheduler = tokio::spawn(run_reminder_scheduler(
        service_deps.clone(),
        notifier,
        config.reminder_interval,
        shutdown_rx,
    ));

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    // Stop the scheduler and wait for it to finish
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        tracing::error!("Reminder scheduler task failed: {}", e);
    }

    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
