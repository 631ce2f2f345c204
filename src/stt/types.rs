// STT Types and Error Definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Word-level timing passed through from the transcription vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub confidence: f64,
}

/// Transcription of one media payload (a whole file or one segment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    #[serde(default)]
    pub words: Vec<WordTiming>,
    /// Confidence score (0.0 - 1.0)
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("authentication failed")]
    Authentication,

    #[error("transcription failed: {0}")]
    Vendor(String),

    #[error("malformed transcription response: {0}")]
    MalformedResponse(String),
}
