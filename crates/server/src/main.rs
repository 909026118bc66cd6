//! Portfolio event log entry point.

use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use metrics_exporter_prometheus::PrometheusBuilder;
use server::{App, Config, ServerError};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn run<S: EventStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Result<(), ServerError> {
    let app = App::bootstrap(store, config).await?;
    app.run_until(config, shutdown_signal()).await
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder and its scrape endpoint
    PrometheusBuilder::new()
        .with_http_listener(config.metrics_addr)
        .install()?;
    tracing::info!(addr = %config.metrics_addr, "metrics endpoint listening");

    // 3. Open the event store and run
    match &config.database_url {
        Some(url) => {
            let store = PostgresEventStore::connect(url).await?;
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL event store");
            run(store, &config).await?;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, events are kept in memory only");
            run(InMemoryEventStore::new(), &config).await?;
        }
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}
