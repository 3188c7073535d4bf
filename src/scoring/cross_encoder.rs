//! Cross-encoder model via OpenAI-compatible `/v1/rerank` endpoint.
//!
//! Sends a single batch request with all query-document pairs instead of
//! one call per document.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RerankerConfig;
use crate::error::ScoringError;

/// A loaded pairwise relevance model.
///
/// Implementations are shared read-only across concurrent requests; any
/// locking an implementation needs is its own business.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Score `(query, documents[i])` for every `i`. Output has one raw score
    /// per document in input order.
    async fn predict(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ScoringError>;
}

/// Cross-encoder served by an external rerank endpoint (e.g. llama-server).
#[derive(Debug, Clone)]
pub struct HttpCrossEncoder {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout: std::time::Duration,
}

impl HttpCrossEncoder {
    /// Build the client and issue a warm-up request so an unreachable or
    /// broken endpoint fails at startup rather than on the first call.
    pub async fn connect(config: &RerankerConfig) -> Result<Self> {
        let encoder = Self::new(config)?;
        let scores = encoder
            .predict("warmup", &["warmup".to_string()])
            .await
            .context("Cross-encoder warm-up request failed")?;
        tracing::info!(
            "Cross-encoder ready at {} (model '{}', warm-up score {:.4})",
            encoder.url,
            encoder.model,
            scores.first().copied().unwrap_or_default()
        );
        Ok(encoder)
    }

    /// Build the client without contacting the endpoint.
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .context("Reranker base_url not configured (set RERANKER_BASE_URL)")?;

        let model = config.model.as_deref().unwrap_or("default").to_string();
        let url = format!("{}/v1/rerank", base_url.trim_end_matches('/'));
        let timeout = std::time::Duration::from_secs(config.timeout_secs.min(30));

        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url,
            model,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CrossEncoder for HttpCrossEncoder {
    async fn predict(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ScoringError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let req_body = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: documents.len(),
        };

        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&req_body)
            .send()
            .await
            .map_err(|e| ScoringError::Model(format!("Failed to reach reranker endpoint: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ScoringError::Model(format!(
                "Reranker returned {status}: {body}"
            )));
        }

        let body: RerankResponse = resp
            .json()
            .await
            .map_err(|e| ScoringError::Model(format!("Failed to parse reranker response: {e}")))?;

        scores_in_input_order(body.results, documents.len())
    }
}

/// The endpoint returns results sorted by relevance; put them back in input
/// order. Every index must appear exactly once.
fn scores_in_input_order(
    results: Vec<RerankResultRaw>,
    expected: usize,
) -> Result<Vec<f32>, ScoringError> {
    if results.len() != expected {
        return Err(ScoringError::LengthMismatch {
            expected,
            actual: results.len(),
        });
    }

    let mut scores: Vec<Option<f32>> = vec![None; expected];
    for r in results {
        let slot = scores.get_mut(r.index).ok_or_else(|| {
            ScoringError::Model(format!("Reranker returned out-of-range index {}", r.index))
        })?;
        if slot.is_some() {
            return Err(ScoringError::Model(format!(
                "Reranker returned duplicate index {}",
                r.index
            )));
        }
        *slot = Some(r.relevance_score);
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| ScoringError::Model(format!("Reranker omitted index {i}"))))
        .collect()
}

// ─── Request/Response types ────────────────────────────

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultRaw>,
}

#[derive(Deserialize)]
struct RerankResultRaw {
    index: usize,
    relevance_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(index: usize, relevance_score: f32) -> RerankResultRaw {
        RerankResultRaw {
            index,
            relevance_score,
        }
    }

    #[test]
    fn test_results_restored_to_input_order() {
        let results = vec![raw(2, 3.5), raw(0, 1.25), raw(1, -2.0)];
        let scores = scores_in_input_order(results, 3).unwrap();
        assert_eq!(scores, vec![1.25, -2.0, 3.5]);
    }

    #[test]
    fn test_raw_scores_not_normalized() {
        let scores = scores_in_input_order(vec![raw(0, 7.5)], 1).unwrap();
        assert_eq!(scores, vec![7.5]);
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let err = scores_in_input_order(vec![raw(0, 1.0), raw(0, 2.0)], 2).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let err = scores_in_input_order(vec![raw(5, 1.0)], 1).unwrap_err();
        assert!(err.to_string().contains("out-of-range"));
    }

    #[test]
    fn test_short_response_rejected() {
        let err = scores_in_input_order(vec![raw(0, 1.0)], 2).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::LengthMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_new_requires_base_url() {
        let err = HttpCrossEncoder::new(&RerankerConfig::default()).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_url_trailing_slash_trimmed() {
        let config = RerankerConfig {
            base_url: Some("http://127.0.0.1:8082/".to_string()),
            ..RerankerConfig::default()
        };
        let encoder = HttpCrossEncoder::new(&config).unwrap();
        assert_eq!(encoder.url(), "http://127.0.0.1:8082/v1/rerank");
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let config = RerankerConfig {
            base_url: Some("http://127.0.0.1:9".to_string()),
            ..RerankerConfig::default()
        };
        let encoder = HttpCrossEncoder::new(&config).unwrap();
        assert!(encoder.predict("q", &[]).await.unwrap().is_empty());
    }
}
