use std::sync::Arc;

use mailsift_core::{ExtractionCache, ExtractionClient, LlmServiceConfig, OpenAiClient};

/// Shared application state. The cache is the only structure shared across
/// concurrent requests.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ExtractionCache>,
    pub client: Arc<dyn ExtractionClient>,
    /// Default model when the request does not select one
    pub model: String,
}

impl AppState {
    pub fn new(client: Arc<dyn ExtractionClient>, model: String) -> Self {
        Self {
            cache: Arc::new(ExtractionCache::new()),
            client,
            model,
        }
    }

    pub fn from_config(config: LlmServiceConfig) -> anyhow::Result<Self> {
        let model = config.model.clone();
        let client = Arc::new(OpenAiClient::new(config)?);
        Ok(Self::new(client, model))
    }
}
