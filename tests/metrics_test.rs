//! Metrics exported through the process-wide Prometheus recorder.
//!
//! Kept in its own test binary: installing the global recorder is a
//! once-per-process operation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use rerank_service::error::ScoringError;
use rerank_service::models::{CandidateDocument, RankRequest};
use rerank_service::rpc::{RankingClient, RpcServer};
use rerank_service::scoring::Scorer;
use rerank_service::service::RankingService;
use rerank_service::telemetry;

/// Scores by candidate position; fails when the query is "fail".
struct PositionScorer;

#[async_trait]
impl Scorer for PositionScorer {
    fn name(&self) -> &'static str {
        "position"
    }

    async fn score_batch(
        &self,
        query: &str,
        documents: &[CandidateDocument],
    ) -> Result<Vec<f32>, ScoringError> {
        if query == "fail" {
            return Err(ScoringError::Model("refused".to_string()));
        }
        Ok((0..documents.len()).map(|i| i as f32).collect())
    }
}

/// Value of the sample line that starts with `series`.
fn sample(rendered: &str, series: &str) -> Option<f64> {
    rendered
        .lines()
        .find(|line| line.starts_with(series))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

fn request(query: &str, candidates: usize) -> RankRequest {
    RankRequest {
        query: query.to_string(),
        candidates: (0..candidates)
            .map(|i| CandidateDocument::new(format!("d{i}"), "", "text"))
            .collect(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rpc_calls_show_up_on_metrics_endpoint() {
    let prometheus_handle = telemetry::install_prometheus();

    let service = Arc::new(RankingService::new(Arc::new(PositionScorer), 2));
    let server = RpcServer::bind("127.0.0.1:0", Arc::clone(&service), Duration::from_secs(1))
        .await
        .unwrap();
    let rpc_addr = server.local_addr().unwrap();
    tokio::spawn(server.serve(std::future::pending::<()>()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = listener.local_addr().unwrap();
    let app = rerank_service::admin::router(Arc::clone(&service), prometheus_handle);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut client = RankingClient::connect(rpc_addr).await.unwrap();
    client.rerank(&request("q", 4)).await.unwrap();
    client.rerank(&request("q", 2)).await.unwrap();
    assert!(client.rerank(&request("fail", 5)).await.is_err());
    client.get_embedding("hello").await.unwrap();

    let body = reqwest::get(format!("http://{admin_addr}/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let scorer = "{scorer=\"position\"}";
    assert_eq!(sample(&body, &format!("rerank_requests_total{scorer}")), Some(3.0));
    assert_eq!(sample(&body, &format!("rerank_failures_total{scorer}")), Some(1.0));
    assert_eq!(sample(&body, &format!("rerank_candidates_total{scorer}")), Some(6.0));
    assert_eq!(
        sample(&body, &format!("rerank_duration_seconds_count{scorer}")),
        Some(3.0)
    );
    assert_eq!(sample(&body, "embedding_requests_total"), Some(1.0));
}
