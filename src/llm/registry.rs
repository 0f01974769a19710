//! Model registry for managing available LLM providers

use super::{all_models, LlmService, LoggingService, ModelDef, Provider};
use std::collections::HashMap;
use std::sync::Arc;

pub const FALLBACK_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible endpoint, e.g. `http://localhost:11434/v1`
    pub openai_base_url: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_base_url: std::env::var("OPENAI_BASE_URL").ok(),
            default_model: std::env::var("DEFAULT_MODEL").ok(),
        }
    }

    fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAI => self.openai_api_key.as_deref(),
        }
    }
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        for model_def in all_models() {
            let Some(api_key) = config.api_key(model_def.provider) else {
                continue;
            };
            match model_def.build(api_key, config.openai_base_url.as_deref()) {
                Ok(service) => {
                    services.insert(
                        model_def.id.to_string(),
                        Arc::new(LoggingService::new(service)),
                    );
                }
                Err(e) => {
                    tracing::warn!(model = model_def.id, error = %e, "Skipping model");
                }
            }
        }

        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| FALLBACK_DEFAULT_MODEL.to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }

    pub fn available_models(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.services.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Definitions of the models this registry can serve
    pub fn available_defs(&self) -> Vec<&'static ModelDef> {
        all_models()
            .iter()
            .filter(|def| self.services.contains_key(def.id))
            .collect()
    }
}
