//! Provider configuration and service construction

use super::gemini::{GeminiService, DEFAULT_GEMINI_MODEL};
use super::{LlmService, LoggingService};
use std::sync::Arc;

/// Configuration for the text-generation provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    /// Proxy base URL; when set no API key is sent
    pub gateway: Option<String>,
    pub model: Option<String>,
}

impl LlmConfig {
    /// Read provider settings through `var`, which should already treat
    /// blank values as unset
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            gemini_api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
            gateway: var("LLM_GATEWAY"),
            model: var("GEMINI_MODEL"),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }
}

/// Holds the configured model, if any
pub struct ModelRegistry {
    service: Option<Arc<dyn LlmService>>,
}

impl ModelRegistry {
    pub fn new_empty() -> Self {
        Self { service: None }
    }

    pub fn new(config: &LlmConfig) -> Self {
        // Gateway mode authenticates upstream; direct mode needs a key
        let api_key = match (&config.gateway, &config.gemini_api_key) {
            (Some(_), _) => None,
            (None, Some(key)) => Some(key.clone()),
            (None, None) => return Self::new_empty(),
        };

        let service = match GeminiService::new(api_key, config.model_name(), config.gateway.as_deref()) {
            Ok(service) => Some(Arc::new(LoggingService::new(Arc::new(service))) as Arc<dyn LlmService>),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Gemini service");
                None
            }
        };

        Self { service }
    }

    pub fn default_service(&self) -> Option<Arc<dyn LlmService>> {
        self.service.clone()
    }

    pub fn has_models(&self) -> bool {
        self.service.is_some()
    }

    pub fn default_model_id(&self) -> Option<&str> {
        self.service.as_deref().map(LlmService::model_id)
    }
}
