//! HTTP client for OpenAI-compatible extraction calls
//!
//! Every failure mode is absorbed into an [`ExtractionOutcome`]: no credential
//! becomes `skipped`, transport and provider errors become `error` with a
//! timeout/provider classification, and malformed JSON output goes through the
//! salvage parser in `schema`.

use crate::config::LlmServiceConfig;
use crate::error::Result;
use crate::llm::prompt::{AttachmentSummary, ExtractionRequest, SYSTEM_INSTRUCTIONS};
use crate::llm::schema::{
    extraction_data_from_content, ExtractionOutcome, ProviderErrorKind, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Trait seam for the external extraction call, so tests and alternative
/// providers can swap in without touching the cache or resolver.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> ExtractionOutcome;
}

/// OpenAI-compatible chat-completions client
pub struct OpenAiClient {
    http_client: reqwest::Client,
    config: LlmServiceConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LlmServiceConfig::default())
    }

    async fn call(&self, request: &ExtractionRequest, api_key: &str) -> ExtractionOutcome {
        let start = Instant::now();

        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            format_type: &'static str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            temperature: f32,
            response_format: ResponseFormat,
            messages: Vec<ChatMessage<'a>>,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
            #[serde(default)]
            usage: Option<TokenUsage>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            #[serde(default)]
            content: Option<String>,
        }

        #[derive(Serialize)]
        struct UserPayload<'a> {
            email_thread_text: &'a str,
            attachments: &'a [AttachmentSummary],
            instructions: &'a str,
        }

        let user_content = match serde_json::to_string(&UserPayload {
            email_thread_text: &request.email_text,
            attachments: &request.attachment_summaries,
            instructions: &request.instructions,
        }) {
            Ok(content) => content,
            Err(e) => {
                return ExtractionOutcome::Error {
                    kind: ProviderErrorKind::Provider,
                    message: format!("Failed to serialize prompt: {}", e),
                    latency_ms: None,
                }
            }
        };

        let body = ChatRequest {
            model: &request.model,
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTIONS,
                },
                ChatMessage {
                    role: "user",
                    content: &user_content,
                },
            ],
        };

        let url = format!("{}/v1/chat/completions", self.config.url);
        let response = match self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return error_outcome(classify_transport_error(&e), e.to_string(), start);
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return error_outcome(
                ProviderErrorKind::Provider,
                format!("LLM service error (HTTP {}): {}", status, body),
                start,
            );
        }

        let chat_response: ChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return error_outcome(classify_transport_error(&e), e.to_string(), start);
            }
        };

        let content = chat_response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("{}")
            .trim()
            .to_string();

        let data = extraction_data_from_content(&content);
        let estimated_cost_usd = chat_response
            .usage
            .as_ref()
            .and_then(|u| estimate_cost(&request.model, u));

        ExtractionOutcome::Ok {
            model: request.model.clone(),
            data,
            usage: chat_response.usage,
            estimated_cost_usd,
            latency_ms: start.elapsed().as_millis() as u64,
            cached: false,
        }
    }
}

#[async_trait]
impl ExtractionClient for OpenAiClient {
    async fn extract(&self, request: &ExtractionRequest) -> ExtractionOutcome {
        let Some(api_key) = self.config.api_key.clone() else {
            tracing::debug!("No API key configured, skipping extraction");
            return ExtractionOutcome::Skipped {
                reason: "missing_api_key".to_string(),
            };
        };
        self.call(request, &api_key).await
    }
}

fn error_outcome(kind: ProviderErrorKind, message: String, start: Instant) -> ExtractionOutcome {
    tracing::warn!("Extraction call failed ({:?}): {}", kind, message);
    ExtractionOutcome::Error {
        kind,
        message,
        latency_ms: Some(start.elapsed().as_millis() as u64),
    }
}

/// Classify a transport error as timeout or generic provider failure
fn classify_transport_error(error: &reqwest::Error) -> ProviderErrorKind {
    let message = error.to_string().to_lowercase();
    if error.is_timeout() || message.contains("timed out") || message.contains("timeout") {
        ProviderErrorKind::Timeout
    } else {
        ProviderErrorKind::Provider
    }
}

/// Estimate the call cost in USD from published per-token prices. Unknown
/// models report no cost.
fn estimate_cost(model: &str, usage: &TokenUsage) -> Option<f64> {
    // (input, output) USD per 1M tokens
    let (input_price, output_price) = match model {
        "gpt-4o-mini" => (0.15, 0.60),
        "gpt-4o" => (2.50, 10.00),
        _ => return None,
    };
    Some(
        usage.prompt_tokens as f64 / 1_000_000.0 * input_price
            + usage.completion_tokens as f64 / 1_000_000.0 * output_price,
    )
}
