// Environment-driven settings

use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:4000";

const ENV_SERVER_URL: &str = "SERVER_BASE_URL";
const ENV_TRANSCRIPTION_KEY: &str = "TRANSCRIPTION_API_KEY";
const ENV_ANALYSIS_KEY: &str = "ANALYSIS_API_KEY";
const ENV_ANALYSIS_URL: &str = "ANALYSIS_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Settings for the pipeline's three collaborators.
///
/// A missing vendor key fails construction here, before any run starts;
/// it is never surfaced as a per-call error.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the backend that issues presigned uploads and relays
    /// transcription requests.
    pub server_base_url: String,
    pub transcription_api_key: String,
    pub analysis_api_key: String,
    /// Override for the LLM vendor endpoint, used by tests.
    pub analysis_base_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let server_base_url =
            std::env::var(ENV_SERVER_URL).unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

        let settings = Self {
            server_base_url,
            transcription_api_key: required(ENV_TRANSCRIPTION_KEY)?,
            analysis_api_key: required(ENV_ANALYSIS_KEY)?,
            analysis_base_url: std::env::var(ENV_ANALYSIS_URL).ok(),
        };

        tracing::info!("Settings loaded: server={}", settings.server_base_url);
        Ok(settings)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank_values() {
        std::env::set_var("SESSIONSCRIBE_TEST_BLANK", "   ");
        assert!(required("SESSIONSCRIBE_TEST_BLANK").is_err());
        std::env::remove_var("SESSIONSCRIBE_TEST_BLANK");
        assert!(required("SESSIONSCRIBE_TEST_BLANK").is_err());
    }
}
