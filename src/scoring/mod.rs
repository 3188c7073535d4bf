//! Relevance scorers.
//!
//! A [`Scorer`] turns `(query, documents)` into one score per document, in
//! input order. Two strategies ship:
//!
//! - [`LexicalOverlapScorer`] - fraction of query words found in the document text
//! - [`NeuralPairScorer`] - batched cross-encoder scoring of `(query, document)` pairs
//!
//! The variant is chosen once at startup by [`build_scorer`] and shared
//! read-only by every request.

pub mod cross_encoder;
pub mod lexical;
pub mod neural;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{Config, ScorerKind};
use crate::error::ScoringError;
use crate::models::CandidateDocument;

pub use cross_encoder::{CrossEncoder, HttpCrossEncoder};
pub use lexical::LexicalOverlapScorer;
pub use neural::NeuralPairScorer;

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Short name used in logs and the admin surface.
    fn name(&self) -> &'static str;

    /// Score every document against `query`. The returned vector has the same
    /// length and order as `documents`; an empty batch yields an empty vector.
    async fn score_batch(
        &self,
        query: &str,
        documents: &[CandidateDocument],
    ) -> Result<Vec<f32>, ScoringError>;
}

/// Construct and fully initialize the configured scorer.
///
/// Any error here is a startup failure: the caller must not start serving.
pub async fn build_scorer(config: &Config) -> Result<Arc<dyn Scorer>> {
    match config.scorer_kind()? {
        ScorerKind::Lexical => Ok(Arc::new(LexicalOverlapScorer::new())),
        ScorerKind::Neural => {
            let model = HttpCrossEncoder::connect(&config.reranker)
                .await
                .context("Failed to load cross-encoder model")?;
            Ok(Arc::new(NeuralPairScorer::new(Arc::new(model))))
        }
    }
}
