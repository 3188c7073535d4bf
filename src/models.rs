use serde::{Deserialize, Serialize};

/// A candidate proposed by upstream retrieval. Absent fields decode as empty text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content_snippet: String,
}

impl CandidateDocument {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content_snippet: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content_snippet: content_snippet.into(),
        }
    }

    /// Title and snippet joined by a single space, skipping empty fields.
    pub fn text(&self) -> String {
        match (self.title.is_empty(), self.content_snippet.is_empty()) {
            (true, _) => self.content_snippet.clone(),
            (false, true) => self.title.clone(),
            (false, false) => format!("{} {}", self.title, self.content_snippet),
        }
    }
}

/// A candidate after scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    pub id: String,
    pub score: f32,
}

/// ReRank request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub candidates: Vec<CandidateDocument>,
}

/// ReRank response, ordered by descending score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankResponse {
    #[serde(default)]
    pub results: Vec<RankedDocument>,
}

/// GetEmbedding request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    #[serde(default)]
    pub text: String,
}

/// GetEmbedding response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub vector: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_decode_as_empty() {
        let req: RankRequest =
            serde_json::from_str(r#"{"candidates": [{"id": "a"}, {}]}"#).unwrap();
        assert_eq!(req.query, "");
        assert_eq!(req.candidates.len(), 2);
        assert_eq!(req.candidates[0].id, "a");
        assert_eq!(req.candidates[0].title, "");
        assert_eq!(req.candidates[1], CandidateDocument::default());
    }

    #[test]
    fn test_empty_object_is_empty_request() {
        let req: RankRequest = serde_json::from_str("{}").unwrap();
        assert!(req.query.is_empty());
        assert!(req.candidates.is_empty());
    }

    #[test]
    fn test_document_text_joins_fields() {
        assert_eq!(CandidateDocument::new("1", "Title", "body").text(), "Title body");
        assert_eq!(CandidateDocument::new("1", "", "body").text(), "body");
        assert_eq!(CandidateDocument::new("1", "Title", "").text(), "Title");
        assert_eq!(CandidateDocument::new("1", "", "").text(), "");
    }
}
