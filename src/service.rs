use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::error::{ScoringError, ServiceError};
use crate::models::{EmbeddingRequest, EmbeddingResponse, RankRequest, RankResponse};
use crate::ranker;
use crate::scoring::Scorer;
use crate::telemetry;

/// Fixed vector returned by `GetEmbedding` until real embeddings exist.
pub const PLACEHOLDER_EMBEDDING: [f32; 3] = [0.1, 0.2, 0.3];

/// Lifecycle of the service. Construction requires a loaded scorer, so a
/// service always starts out `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Ready,
    Serving,
    Stopped,
}

/// Request/response boundary around the ranker.
///
/// Holds the scorer loaded at startup and shares it read-only with every
/// call. A semaphore caps how many requests are scored at once; the rest
/// wait for a permit.
pub struct RankingService {
    scorer: Arc<dyn Scorer>,
    workers: Arc<Semaphore>,
    max_workers: usize,
    state: RwLock<ServiceState>,
}

impl RankingService {
    /// Wrap an already initialized scorer. The service starts out `Ready`.
    pub fn new(scorer: Arc<dyn Scorer>, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            scorer,
            workers: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            state: RwLock::new(ServiceState::Ready),
        }
    }

    pub fn state(&self) -> ServiceState {
        *self.state.read()
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn mark_serving(&self) {
        let mut state = self.state.write();
        if *state == ServiceState::Ready {
            *state = ServiceState::Serving;
        }
    }

    /// Refuse further requests. In-flight jobs keep their permits and finish.
    pub fn mark_stopped(&self) {
        *self.state.write() = ServiceState::Stopped;
    }

    /// Rank `request.candidates` against `request.query`.
    pub async fn rerank(&self, request: RankRequest) -> Result<RankResponse, ServiceError> {
        if self.state() == ServiceState::Stopped {
            return Err(ServiceError::Shutdown);
        }

        let start = Instant::now();
        let candidate_count = request.candidates.len();

        if candidate_count == 0 {
            telemetry::record_rerank(self.scorer.name(), 0, start.elapsed(), true);
            return Ok(RankResponse::default());
        }

        let permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| ServiceError::Shutdown)?;

        // Scoring runs in its own task so a panicking scorer fails only this
        // call. If the caller goes away the job still completes and is dropped.
        let scorer = Arc::clone(&self.scorer);
        let RankRequest { query, candidates } = request;
        let job = tokio::spawn(async move {
            let _permit = permit;
            ranker::rank(&query, &candidates, scorer.as_ref()).await
        });

        let outcome = match job.await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(e) => Err(ServiceError::Scoring(ScoringError::Panicked(e.to_string()))),
        };

        let elapsed = start.elapsed();
        telemetry::record_rerank(self.scorer.name(), candidate_count, elapsed, outcome.is_ok());

        match &outcome {
            Ok(_) => tracing::debug!(
                "Ranked {} candidates with {} scorer in {:?}",
                candidate_count,
                self.scorer.name(),
                elapsed
            ),
            Err(e) => tracing::warn!(
                "ReRank of {} candidates failed after {:?}: {e}",
                candidate_count,
                elapsed
            ),
        }

        outcome.map(|results| RankResponse { results })
    }

    /// Placeholder: always the same vector, whatever the input.
    pub fn get_embedding(&self, _request: &EmbeddingRequest) -> EmbeddingResponse {
        telemetry::record_embedding();
        EmbeddingResponse {
            vector: PLACEHOLDER_EMBEDDING.to_vec(),
        }
    }
}
