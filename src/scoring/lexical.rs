use async_trait::async_trait;

use super::Scorer;
use crate::error::ScoringError;
use crate::models::CandidateDocument;

/// Word-overlap baseline with no learned state.
///
/// The query is lowercased and split on whitespace. A word matches when it
/// occurs as a substring anywhere in the lowercased content snippet, so "cat"
/// matches inside "category". The title is not read. Score is
/// `matches / query_words`, or `0.0` for an empty query.
#[derive(Debug, Clone, Default)]
pub struct LexicalOverlapScorer;

impl LexicalOverlapScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score one document against pre-tokenized query words.
    pub fn score_words(query_words: &[String], document: &CandidateDocument) -> f32 {
        if query_words.is_empty() {
            return 0.0;
        }

        let content = document.content_snippet.to_lowercase();
        let matches = query_words
            .iter()
            .filter(|word| content.contains(word.as_str()))
            .count();

        matches as f32 / query_words.len() as f32
    }

    pub fn score(&self, query: &str, document: &CandidateDocument) -> f32 {
        Self::score_words(&tokenize(query), document)
    }
}

/// Lowercase whitespace-delimited words. Duplicates are kept.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Scorer for LexicalOverlapScorer {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn score_batch(
        &self,
        query: &str,
        documents: &[CandidateDocument],
    ) -> Result<Vec<f32>, ScoringError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let words = tokenize(query);
        Ok(documents
            .iter()
            .map(|doc| Self::score_words(&words, doc))
            .collect())
    }
}
