//! Optional HTTP admin surface: liveness and Prometheus metrics.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::service::{RankingService, ServiceState};

#[derive(Clone)]
pub struct AdminState {
    pub service: Arc<RankingService>,
    pub prometheus_handle: PrometheusHandle,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub state: ServiceState,
    pub scorer: &'static str,
}

pub fn router(service: Arc<RankingService>, prometheus_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(AdminState {
            service,
            prometheus_handle,
        })
}

/// GET /health
async fn health(State(state): State<AdminState>) -> Json<Health> {
    Json(Health {
        state: state.service.state(),
        scorer: state.service.scorer_name(),
    })
}

/// GET /metrics
async fn metrics(State(state): State<AdminState>) -> String {
    state.prometheus_handle.render()
}

/// Serve the admin router until `shutdown` resolves.
pub async fn serve<F>(
    addr: &str,
    service: Arc<RankingService>,
    prometheus_handle: PrometheusHandle,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Admin HTTP server listening on {}", addr);
    axum::serve(listener, router(service, prometheus_handle))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
