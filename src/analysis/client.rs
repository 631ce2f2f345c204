// LLM analysis client (chat completions with a strict output schema)

use super::{AnalysisError, SessionAnalysis};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-4o";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1200;
const TIMEOUT_SECS: u64 = 90;

const SYSTEM_PROMPT: &str = "You are a skilled clinical analyst helping to interpret therapy \
sessions with non-verbal learners using a spelling board.";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    response_format: serde_json::Value,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct AnalysisClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        tracing::info!("Analysis client initialized");

        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Analyze a full session transcript into the four-field structure.
    ///
    /// Every call is an independent vendor request; nothing is cached, so
    /// the same transcript submitted twice may come back worded differently.
    pub async fn analyze(&self, transcript: &str) -> Result<SessionAnalysis, AnalysisError> {
        let request = ChatRequest {
            model: MODEL.to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(transcript),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            response_format: output_schema(),
        };

        tracing::info!("Analyzing transcript ({} chars)", transcript.len());

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Request(format!("HTTP {}: {}", status, body)));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Request(format!("unparsable body: {}", e)))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AnalysisError::Request("response carried no choices".to_string()))?;

        let analysis: SessionAnalysis = serde_json::from_str(content)
            .map_err(|e| AnalysisError::Validation(e.to_string()))?;
        analysis.validate()?;

        tracing::info!(
            "Analysis complete: {} successes, {} struggles, {} topics",
            analysis.successes.len(),
            analysis.struggles.len(),
            analysis.topics_discussed.len()
        );

        Ok(analysis)
    }
}

fn build_user_prompt(transcript: &str) -> String {
    format!(
        "The following is a transcript of a therapy session between a therapist and a \
non-verbal learner. The therapist uses a spelling board to help the learner express \
themselves.\n\n\
Your task:\n\n\
1. Summarize the session clearly and professionally.\n\
2. Identify where the learner succeeded. Quote examples.\n\
3. Identify where the learner struggled. Quote examples.\n\
4. Give an overview of the topics discussed during the session.\n\n\
Respond with a JSON object containing exactly these fields: \"summary\" (string), \
\"successes\" (array of strings), \"struggles\" (array of strings), \
\"topicsDiscussed\" (array of strings).\n\n\
Transcript:\n{}",
        transcript
    )
}

/// Output constrained to the four-field shape with no additional keys.
fn output_schema() -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "session_analysis",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "summary": { "type": "string" },
                    "successes": { "type": "array", "items": { "type": "string" } },
                    "struggles": { "type": "array", "items": { "type": "string" } },
                    "topicsDiscussed": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["summary", "successes", "struggles", "topicsDiscussed"],
                "additionalProperties": false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_embeds_transcript_and_field_names() {
        let prompt = build_user_prompt("I want more time outside");
        assert!(prompt.contains("Transcript:\nI want more time outside"));
        assert!(prompt.contains("\"topicsDiscussed\""));
    }

    #[test]
    fn schema_requires_all_four_fields_and_no_extras() {
        let schema = output_schema();
        let required = &schema["json_schema"]["schema"]["required"];
        assert_eq!(required.as_array().unwrap().len(), 4);
        assert_eq!(
            schema["json_schema"]["schema"]["additionalProperties"],
            serde_json::Value::Bool(false)
        );
    }
}
