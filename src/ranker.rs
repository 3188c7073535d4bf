use crate::error::ScoringError;
use crate::models::{CandidateDocument, RankedDocument};
use crate::scoring::Scorer;

/// Score `candidates` with `scorer` and return them by descending score.
///
/// Scores are re-associated with ids by position. The sort is stable, so
/// equal scores keep their input order. Scores pass through
/// unchanged; no clipping or normalization happens here.
pub async fn rank(
    query: &str,
    candidates: &[CandidateDocument],
    scorer: &dyn Scorer,
) -> Result<Vec<RankedDocument>, ScoringError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let scores = scorer.score_batch(query, candidates).await?;
    if scores.len() != candidates.len() {
        return Err(ScoringError::LengthMismatch {
            expected: candidates.len(),
            actual: scores.len(),
        });
    }

    let mut results: Vec<RankedDocument> = candidates
        .iter()
        .zip(scores)
        .map(|(doc, score)| RankedDocument {
            id: doc.id.clone(),
            score,
        })
        .collect();

    // Sort by score descending
    results.sort_by(|a, b| sort_key(b.score).total_cmp(&sort_key(a.score)));

    Ok(results)
}

/// `total_cmp` puts -0.0 below 0.0; fold it so equal zeros stay a tie.
fn sort_key(score: f32) -> f32 {
    if score == 0.0 {
        0.0
    } else {
        score
    }
}
