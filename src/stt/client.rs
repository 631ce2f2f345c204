// HTTP transcription client (custom backend relay)

use super::{TranscriptionBackend, TranscriptionError, TranscriptionResult};
use crate::media::MediaFile;
use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

const TIMEOUT_SECS: u64 = 300;
const FALLBACK_ERROR: &str = "Transcription service returned an error";

/// Response body is either the normalized vendor shape or an error object;
/// anything else is rejected as malformed.
#[derive(Deserialize)]
#[serde(untagged)]
enum VendorResponse {
    Error { error: String },
    Success(TranscriptionResult),
}

#[derive(Serialize)]
struct StoredRequest<'a> {
    key: &'a str,
}

pub struct TranscriptionClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl TranscriptionClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        tracing::info!("Transcription client initialized");

        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    async fn decode(
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let resp = match response {
            Ok(resp) => resp,
            Err(e) => {
                return if e.is_timeout() {
                    Err(TranscriptionError::Timeout)
                } else {
                    Err(TranscriptionError::Network(e.to_string()))
                };
            }
        };

        let status = resp.status();

        if status.as_u16() == 401 {
            return Err(TranscriptionError::Authentication);
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TranscriptionError::Network(e.to_string()))?;

        if !status.is_success() {
            // Prefer the vendor's own message when the error body carries one.
            let message = serde_json::from_str::<VendorResponse>(&body)
                .ok()
                .and_then(|r| match r {
                    VendorResponse::Error { error } => Some(error),
                    VendorResponse::Success(_) => None,
                })
                .unwrap_or_else(|| format!("{}: HTTP {}", FALLBACK_ERROR, status));
            return Err(TranscriptionError::Vendor(message));
        }

        match serde_json::from_str::<VendorResponse>(&body) {
            Ok(VendorResponse::Success(mut result)) => {
                result.text = clean_transcript(&result.text);
                Ok(result)
            }
            Ok(VendorResponse::Error { error }) => Err(TranscriptionError::Vendor(error)),
            Err(e) => Err(TranscriptionError::MalformedResponse(e.to_string())),
        }
    }
}

#[async_trait]
impl TranscriptionBackend for TranscriptionClient {
    async fn transcribe_media(
        &self,
        media: &MediaFile,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        tracing::info!(
            "Transcribing {} ({} bytes)",
            media.file_name,
            media.len()
        );

        let file_part = multipart::Part::bytes(media.bytes.clone())
            .file_name(media.file_name.clone())
            .mime_str(&media.mime_type)
            .map_err(|e| TranscriptionError::Vendor(e.to_string()))?;

        let form = multipart::Form::new().part("file", file_part);

        let response = self
            .client
            .post(format!("{}/transcribe", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await;

        Self::decode(response).await
    }

    async fn transcribe_stored(
        &self,
        key: &str,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        tracing::info!("Transcribing stored object {}", key);

        let response = self
            .client
            .post(format!("{}/transcribe-url", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&StoredRequest { key })
            .send()
            .await;

        Self::decode(response).await
    }
}

/// Strip bracketed timestamps some vendors interleave and collapse runs of
/// whitespace.
pub(crate) fn clean_transcript(text: &str) -> String {
    static TS_RE: OnceLock<Regex> = OnceLock::new();
    let re = TS_RE.get_or_init(|| {
        Regex::new(r"\[\d{2}:\d{2}.*?\]|\(\d{2}:\d{2}\)").expect("valid timestamp regex")
    });
    let stripped = re.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_transcript_strips_timestamps() {
        let raw = "[00:01.5] hello  world (02:30) again";
        assert_eq!(clean_transcript(raw), "hello world again");
    }

    #[test]
    fn clean_transcript_collapses_whitespace() {
        assert_eq!(clean_transcript("  a\n b\t\tc "), "a b c");
    }

    #[test]
    fn vendor_error_body_wins_over_fallback() {
        let parsed: VendorResponse =
            serde_json::from_str(r#"{"error":"no speech detected"}"#).unwrap();
        assert!(matches!(
            parsed,
            VendorResponse::Error { error } if error == "no speech detected"
        ));
    }

    #[test]
    fn success_body_decodes_words_and_confidence() {
        let parsed: VendorResponse = serde_json::from_str(
            r#"{"text":"hi","words":[{"word":"hi","start":0.1,"end":0.4,"confidence":0.9}],"confidence":0.92}"#,
        )
        .unwrap();
        match parsed {
            VendorResponse::Success(result) => {
                assert_eq!(result.text, "hi");
                assert_eq!(result.words.len(), 1);
                assert!((result.confidence - 0.92).abs() < f64::EPSILON);
            }
            VendorResponse::Error { .. } => panic!("expected success variant"),
        }
    }
}
