//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mflow_api::{create_router, metrics, ApiConfig, AppState};
use mflow_media::FfmpegRunner;
use mflow_queue::{FileStatusSink, Scheduler, SchedulerConfig, StatusSink, TracingStatusSink, WebhookNotifier};
use mflow_storage::{LocalStorage, LocatorResolver};
use mflow_worker::{MediaJobHandler, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting mflow-api");

    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    let storage = Arc::new(LocalStorage::from_env().context("failed to prepare local storage")?);
    let download_root = storage.root().to_path_buf();
    info!("Serving downloads from {}", download_root.display());

    let handler = MediaJobHandler::new(storage, FfmpegRunner::from_env(), WorkerConfig::from_env());

    let sink: Arc<dyn StatusSink> = match FileStatusSink::from_env().context("failed to open job status directory")? {
        Some(sink) => {
            info!("Writing job status to {}", sink.dir().display());
            Arc::new(sink)
        }
        None => Arc::new(TracingStatusSink),
    };

    let scheduler_config = SchedulerConfig::from_env();
    info!(
        "Scheduler config: max_queue_length={}, build_number={}",
        scheduler_config.max_queue_length, scheduler_config.build_number
    );
    let (scheduler, worker) = Scheduler::new(handler, sink, WebhookNotifier::new()?, scheduler_config);
    let worker_task = tokio::spawn(worker.run());

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let app = create_router(AppState::new(config.clone(), scheduler, download_root), metrics_handle);

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_addr()))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker_task.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
