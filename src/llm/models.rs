//! Model definitions
//!
//! All selectable models live in one table; the registry walks it to
//! decide what can be served with the configured credentials.

use super::openai::OpenAIModel;
use super::{LlmService, OpenAIService};
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAI,
}

impl Provider {
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
        }
    }

    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID
    pub id: &'static str,
    pub provider: Provider,
    pub description: &'static str,
    pub model: OpenAIModel,
}

impl ModelDef {
    pub fn context_window(&self) -> usize {
        self.model.context_window()
    }

    pub fn build(&self, api_key: &str, base_url: Option<&str>) -> Result<Arc<dyn LlmService>, String> {
        if api_key.is_empty() {
            return Err(format!(
                "{} requires {}",
                self.id,
                self.provider.api_key_env_var()
            ));
        }
        let service = OpenAIService::new(api_key.to_string(), self.model, base_url)
            .map_err(|e| e.to_string())?;
        Ok(Arc::new(service))
    }
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            description: "GPT-4o mini (fast, inexpensive)",
            model: OpenAIModel::GPT4oMini,
        },
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            description: "GPT-4o",
            model: OpenAIModel::GPT4o,
        },
        ModelDef {
            id: "gpt-4.1",
            provider: Provider::OpenAI,
            description: "GPT-4.1 (long context)",
            model: OpenAIModel::GPT41,
        },
        ModelDef {
            id: "gpt-4.1-mini",
            provider: Provider::OpenAI,
            description: "GPT-4.1 mini",
            model: OpenAIModel::GPT41Mini,
        },
        ModelDef {
            id: "o4-mini",
            provider: Provider::OpenAI,
            description: "o4-mini (reasoning)",
            model: OpenAIModel::O4Mini,
        },
    ]
}
