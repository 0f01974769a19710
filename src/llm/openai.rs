//! `OpenAI` and `OpenAI`-compatible chat completions provider

use super::types::{LlmMessage, LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Supported `OpenAI` chat models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIModel {
    GPT4o,
    GPT4oMini,
    GPT41,
    GPT41Mini,
    O4Mini,
}

impl OpenAIModel {
    pub fn api_name(self) -> &'static str {
        match self {
            OpenAIModel::GPT4o => "gpt-4o",
            OpenAIModel::GPT4oMini => "gpt-4o-mini",
            OpenAIModel::GPT41 => "gpt-4.1",
            OpenAIModel::GPT41Mini => "gpt-4.1-mini",
            OpenAIModel::O4Mini => "o4-mini",
        }
    }

    /// Models that use `max_completion_tokens` instead of `max_tokens`
    pub fn uses_max_completion_tokens(self) -> bool {
        matches!(self, OpenAIModel::O4Mini)
    }

    pub fn context_window(self) -> usize {
        match self {
            OpenAIModel::GPT4o | OpenAIModel::GPT4oMini => 128_000,
            OpenAIModel::GPT41 | OpenAIModel::GPT41Mini => 1_047_576,
            OpenAIModel::O4Mini => 200_000,
        }
    }
}

/// OpenAI-compatible service implementation
pub struct OpenAIService {
    client: Client,
    api_key: String,
    model: OpenAIModel,
    url: String,
}

impl OpenAIService {
    pub fn new(
        api_key: String,
        model: OpenAIModel,
        base_url: Option<&str>,
    ) -> Result<Self, LlmError> {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            url: format!("{base}/chat/completions"),
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = request.system.as_ref().filter(|s| !s.is_empty()) {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(translate_message));

        // O-series models use max_completion_tokens, others use max_tokens
        let (max_tokens, max_completion_tokens) = if self.model.uses_max_completion_tokens() {
            (None, request.max_tokens)
        } else {
            (request.max_tokens, None)
        };

        OpenAIRequest {
            model: self.model.api_name().to_string(),
            messages,
            max_tokens,
            max_completion_tokens,
            stream: false,
        }
    }
}

fn translate_message(msg: &LlmMessage) -> OpenAIMessage {
    let role = match msg.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };
    OpenAIMessage {
        role: role.to_string(),
        content: msg.text.clone(),
    }
}

pub(crate) fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::unknown("No choices in response"))?;

    let text = choice.message.content.unwrap_or_default();
    if text.is_empty() {
        return Err(LlmError::unknown("Empty response from model"));
    }

    Ok(LlmResponse {
        text,
        end_turn: choice.finish_reason.as_deref() == Some("stop"),
        usage: Usage {
            input_tokens: u64::from(resp.usage.prompt_tokens),
            output_tokens: u64::from(resp.usage.completion_tokens),
        },
    })
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let openai_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<OpenAIErrorResponse>(&body) {
                return Err(LlmError::from_status(
                    status.as_u16(),
                    &error_resp.error.message,
                ));
            }
            return Err(LlmError::from_status(status.as_u16(), &body));
        }

        let openai_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        normalize_response(openai_response)
    }

    fn model_id(&self) -> &str {
        self.model.api_name()
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: OpenAIUsage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAIChoice {
    pub message: OpenAIResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAIResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAIUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    message: String,
}
