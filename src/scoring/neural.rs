use std::sync::Arc;

use async_trait::async_trait;

use super::{CrossEncoder, Scorer};
use crate::error::ScoringError;
use crate::models::CandidateDocument;

/// Maximum characters of document text paired with the query.
/// Cross-encoders typically accept ~512 tokens; a character cap is a cheap
/// proxy that keeps inputs under that limit.
pub const MAX_DOCUMENT_CHARS: usize = 1_000;

/// Pairwise scorer wrapping a loaded cross-encoder.
#[derive(Clone)]
pub struct NeuralPairScorer {
    model: Arc<dyn CrossEncoder>,
}

impl NeuralPairScorer {
    pub fn new(model: Arc<dyn CrossEncoder>) -> Self {
        Self { model }
    }
}

/// Keep the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[async_trait]
impl Scorer for NeuralPairScorer {
    fn name(&self) -> &'static str {
        "neural"
    }

    async fn score_batch(
        &self,
        query: &str,
        documents: &[CandidateDocument],
    ) -> Result<Vec<f32>, ScoringError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = documents
            .iter()
            .map(|doc| truncate_chars(&doc.text(), MAX_DOCUMENT_CHARS).to_string())
            .collect();

        let scores = self.model.predict(query, &texts).await?;
        if scores.len() != documents.len() {
            return Err(ScoringError::LengthMismatch {
                expected: documents.len(),
                actual: scores.len(),
            });
        }
        Ok(scores)
    }
}
