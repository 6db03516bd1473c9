//! Sentient orchestrator service entry point.

use std::error::Error;
use std::sync::Arc;

use sentient_core::clock::SystemClock;
use sentient_infrastructure::{InMemoryEventBus, PgSessionRepository, run_migrations};
use sentient_orchestrator::domain::repository::SessionRepository;
use sentient_orchestrator::infrastructure::{InMemoryPuzzleCatalog, InMemorySessionRepository};
use sentient_orchestrator::{EventRouter, OrchestratorService};
use sentient_orchestrator_service::config::{LogFormat, OrchestratorConfig};
use sentient_orchestrator_service::runtime::{OrchestratorRuntime, status_channel};
use sentient_orchestrator_service::state::AppState;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn session_repository(
    config: &OrchestratorConfig,
) -> Result<Arc<dyn SessionRepository>, Box<dyn Error>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set; sessions are kept in memory only");
        return Ok(Arc::new(InMemorySessionRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    run_migrations(&pool).await?;
    tracing::info!("using PostgreSQL session store");
    Ok(Arc::new(PgSessionRepository::new(pool)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = OrchestratorConfig::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(service = %config.service_name, "Starting Sentient orchestrator service");

    let repository = session_repository(&config).await?;
    let bus = InMemoryEventBus::new(config.bus_capacity);
    let subscription = bus.subscribe();

    let mut orchestrator = OrchestratorService::new(
        repository,
        Arc::new(bus.clone()),
        Arc::new(SystemClock),
        config.service_name.clone(),
    );
    if let Some(path) = &config.puzzle_catalog_path {
        let catalog = InMemoryPuzzleCatalog::from_json_file(path)?;
        tracing::info!(path = %path.display(), puzzles = catalog.len(), "loaded puzzle catalog");
        orchestrator = orchestrator.with_puzzle_catalog(Arc::new(catalog));
    }

    let router = EventRouter::new(orchestrator);
    let (status_tx, status_rx) = status_channel(&router);
    let runtime = OrchestratorRuntime::new(
        router,
        subscription,
        status_tx,
        config.controller_timeout,
        config.check_interval,
    );
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let consumer = tokio::spawn(runtime.run(async {
        let _ = stop_rx.await;
    }));

    let app_state = AppState::new(config.service_name.clone(), Arc::new(bus), status_rx);
    let app = sentient_orchestrator_service::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop_tx.send(());
    consumer.await?;
    tracing::info!("Sentient orchestrator service stopped");

    Ok(())
}
