// Analysis types and validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured analysis of one session transcript.
///
/// Exactly these four fields; the decoder rejects extra keys so a drifting
/// vendor payload fails loudly instead of being half-read. List elements
/// are free-form strings (quoted excerpts mixed with explanation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionAnalysis {
    pub summary: String,
    pub successes: Vec<String>,
    pub struggles: Vec<String>,
    #[serde(rename = "topicsDiscussed")]
    pub topics_discussed: Vec<String>,
}

impl SessionAnalysis {
    /// Structural check beyond what serde enforces. Empty lists are fine;
    /// an empty summary is not.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.summary.trim().is_empty() {
            return Err(AnalysisError::Validation(
                "summary must be a non-empty string".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The vendor call itself failed: transport error, non-success status,
    /// or a body that is not even a chat completion.
    #[error("analysis request failed: {0}")]
    Request(String),

    /// The vendor answered, but the payload does not match the required
    /// four-field shape.
    #[error("invalid analysis payload: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_four_fields_with_empty_lists() {
        let analysis: SessionAnalysis = serde_json::from_str(
            r#"{"summary":"Short session.","successes":[],"struggles":[],"topicsDiscussed":[]}"#,
        )
        .unwrap();
        assert!(analysis.validate().is_ok());
    }

    #[test]
    fn rejects_missing_topics_field() {
        let result = serde_json::from_str::<SessionAnalysis>(
            r#"{"summary":"s","successes":[],"struggles":[]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_extra_keys() {
        let result = serde_json::from_str::<SessionAnalysis>(
            r#"{"summary":"s","successes":[],"struggles":[],"topicsDiscussed":[],"mood":"calm"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_mistyped_list_field() {
        let result = serde_json::from_str::<SessionAnalysis>(
            r#"{"summary":"s","successes":"spelled a word","struggles":[],"topicsDiscussed":[]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_summary_fails_validation() {
        let analysis: SessionAnalysis = serde_json::from_str(
            r#"{"summary":"  ","successes":[],"struggles":[],"topicsDiscussed":[]}"#,
        )
        .unwrap();
        assert!(matches!(
            analysis.validate(),
            Err(AnalysisError::Validation(_))
        ));
    }
}
