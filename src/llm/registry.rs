//! Provider configuration and construction

use super::{LlmError, LlmService, LoggingService, OpenAIService};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3.1-8B";

/// Configuration for the completion provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL; without it no provider is built
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
}

impl LlmConfig {
    /// Read settings through `lookup`; `ServerConfig` passes the process env
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            base_url: non_empty("INFERENCE_LLM_URL"),
            api_key: non_empty("INFERENCE_API_KEY").or_else(|| non_empty("HUGGINGFACE_API_KEY")),
            model: non_empty("INFERENCE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Build the provider, wrapped with logging. `None` when no URL is configured.
    pub fn build(&self, timeout: Duration) -> Result<Option<Arc<dyn LlmService>>, LlmError> {
        let Some(base_url) = &self.base_url else {
            return Ok(None);
        };

        let service = OpenAIService::new(base_url, self.api_key.clone(), &self.model, timeout)?;
        Ok(Some(Arc::new(LoggingService::new(Arc::new(service)))))
    }
}
