//! Configuration management

use serde::{Deserialize, Serialize};

/// LLM service configuration for external extraction calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmServiceConfig {
    /// Base URL of the OpenAI-compatible chat completions service
    #[serde(default = "default_url")]
    pub url: String,

    /// Model name for structured extraction
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (optional; extraction is skipped when absent)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("MAILSIFT_LLM_URL").unwrap_or_else(|_| default_url()),
            model: std::env::var("MAILSIFT_LLM_MODEL").unwrap_or_else(|_| default_model()),
            api_key: std::env::var("MAILSIFT_LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok(),
            timeout_secs: std::env::var("MAILSIFT_LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }
}

fn default_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    60
}
