//! LLM integration
//!
//! Prompt assembly, the extraction client seam, the typed result schema, and
//! the fingerprint cache that keeps identical requests to one paid call.

mod cache;
mod client;
mod prompt;
mod schema;

pub use cache::{fingerprint, ExtractionCache, ResultCache};
pub use client::{ExtractionClient, OpenAiClient};
pub use prompt::{
    schema_instructions, AttachmentSummary, ExtractionRequest, ATTACHMENT_SUMMARY_CHARS,
    SPREADSHEET_SUMMARY_CHARS, SYSTEM_INSTRUCTIONS,
};
pub use schema::{
    extraction_data_from_content, parse_model_content, Citation, ExtractionData, ExtractionField,
    ExtractionOutcome, ProviderErrorKind, TokenUsage,
};

/// Cache-or-call: look the request up by fingerprint, invoke the client on a
/// miss, and store the outcome only when it succeeded. Two concurrent misses
/// on the same fingerprint both call out; the duplicate store is benign.
pub async fn extract_with_cache(
    cache: &dyn ResultCache,
    client: &dyn ExtractionClient,
    request: &ExtractionRequest,
) -> ExtractionOutcome {
    let key = fingerprint(request);
    if let Some(hit) = cache.lookup(&key) {
        tracing::debug!("Extraction cache hit for {}", &key[..12]);
        return hit;
    }

    let outcome = client.extract(request).await;
    cache.store(&key, &outcome);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingClient {
        calls: AtomicUsize,
        outcome: ExtractionOutcome,
    }

    #[async_trait]
    impl ExtractionClient for CountingClient {
        async fn extract(&self, _request: &ExtractionRequest) -> ExtractionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn request() -> ExtractionRequest {
        ExtractionRequest {
            email_text: "text".to_string(),
            attachment_summaries: vec![],
            model: "gpt-4o-mini".to_string(),
            instructions: "schema".to_string(),
            guess_mode: false,
        }
    }

    #[tokio::test]
    async fn test_second_identical_request_is_served_from_cache() {
        let cache = ExtractionCache::new();
        let client = CountingClient {
            calls: AtomicUsize::new(0),
            outcome: ExtractionOutcome::Ok {
                model: "gpt-4o-mini".to_string(),
                data: ExtractionData::default(),
                usage: None,
                estimated_cost_usd: None,
                latency_ms: 5,
                cached: false,
            },
        };

        let first = extract_with_cache(&cache, &client, &request()).await;
        let second = extract_with_cache(&cache, &client, &request()).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(first, ExtractionOutcome::Ok { cached: false, .. }));
        assert!(matches!(second, ExtractionOutcome::Ok { cached: true, .. }));
    }

    #[tokio::test]
    async fn test_failed_outcome_is_recomputed() {
        let cache = ExtractionCache::new();
        let client = CountingClient {
            calls: AtomicUsize::new(0),
            outcome: ExtractionOutcome::Error {
                kind: ProviderErrorKind::Provider,
                message: "boom".to_string(),
                latency_ms: None,
            },
        };

        extract_with_cache(&cache, &client, &request()).await;
        extract_with_cache(&cache, &client, &request()).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }
}
