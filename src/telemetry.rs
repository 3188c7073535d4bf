//! Prometheus metrics for the ranking calls.
//!
//! Everything goes through the `metrics` facade; whichever recorder is
//! installed (the Prometheus exporter in the binary) collects it. With no
//! recorder installed the macros are no-ops.

use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const RERANK_REQUESTS: &str = "rerank_requests_total";
pub const RERANK_FAILURES: &str = "rerank_failures_total";
pub const RERANK_CANDIDATES: &str = "rerank_candidates_total";
pub const RERANK_DURATION: &str = "rerank_duration_seconds";
pub const EMBEDDING_REQUESTS: &str = "embedding_requests_total";

/// Install the global Prometheus recorder and return its render handle.
///
/// If a recorder is already installed, a detached handle is returned so
/// callers still have something to render.
pub fn install_prometheus() -> PrometheusHandle {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!("Prometheus recorder not installed: {e}");
            PrometheusBuilder::new().build_recorder().handle()
        }
    }
}

/// Records one finished ReRank call.
///
/// Candidates are only counted for calls that produced a ranking.
pub fn record_rerank(scorer: &'static str, candidates: usize, duration: Duration, ok: bool) {
    counter!(RERANK_REQUESTS, "scorer" => scorer).increment(1);
    histogram!(RERANK_DURATION, "scorer" => scorer).record(duration.as_secs_f64());
    if ok {
        counter!(RERANK_CANDIDATES, "scorer" => scorer).increment(candidates as u64);
    } else {
        counter!(RERANK_FAILURES, "scorer" => scorer).increment(1);
    }
}

pub fn record_embedding() {
    counter!(EMBEDDING_REQUESTS).increment(1);
}
