use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use rerank_service::admin;
use rerank_service::config::Config;
use rerank_service::rpc::RpcServer;
use rerank_service::scoring::build_scorer;
use rerank_service::service::RankingService;
use rerank_service::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let prometheus_handle = telemetry::install_prometheus();

    let config = Config::from_env();
    tracing::info!("Scorer: {}", config.scorer);

    // The model is loaded once, before anything is served.
    let scorer = build_scorer(&config)
        .await
        .context("Scorer initialization failed")?;
    let service = Arc::new(RankingService::new(scorer, config.max_workers));
    tracing::info!("Scorer '{}' loaded", service.scorer_name());

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = stop_tx.send(true);
    });

    let admin_task = config.admin_addr.clone().map(|addr| {
        let service = Arc::clone(&service);
        let stop_rx = stop_rx.clone();
        tokio::spawn(async move {
            let shutdown = stopped(stop_rx);
            if let Err(e) = admin::serve(&addr, service, prometheus_handle, shutdown).await {
                tracing::warn!("Admin server failed: {e:#}");
            }
        })
    });

    let server = RpcServer::bind(
        &config.bind_addr(),
        Arc::clone(&service),
        Duration::from_secs(config.shutdown_grace_secs),
    )
    .await?;
    server.serve(stopped(stop_rx)).await?;

    if let Some(task) = admin_task {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn stopped(mut stop_rx: watch::Receiver<bool>) {
    while !*stop_rx.borrow_and_update() {
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
