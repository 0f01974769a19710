//! Model-call collaborator
//!
//! The session only sees `Generator`: transcript in, reply text and the
//! cumulative token counter out. Provider message types never leave this
//! file.

use crate::history::{Message, Role};
use crate::ledger::TokenCounts;
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const SYSTEM_PROMPT: &str =
    "You are an AI assistant. Provide clear, concise, and helpful responses.";

/// Result of a successful model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub response_text: String,
    /// Counter value after this call, not the call's own usage
    pub usage: TokenCounts,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, context: &[Message], user_text: &str)
        -> Result<Generation, LlmError>;

    /// Current value of the never-reset usage counter
    fn cumulative_usage(&self) -> TokenCounts;

    fn model_id(&self) -> &str;
}

/// Never-reset usage counter, advanced once per successful call
#[derive(Debug, Default)]
pub struct UsageMeter {
    prompt: AtomicU64,
    completion: AtomicU64,
}

impl UsageMeter {
    pub fn add(&self, prompt: u64, completion: u64) -> TokenCounts {
        let prompt = self.prompt.fetch_add(prompt, Ordering::SeqCst) + prompt;
        let completion = self.completion.fetch_add(completion, Ordering::SeqCst) + completion;
        TokenCounts::new(prompt + completion, prompt, completion)
    }

    pub fn read(&self) -> TokenCounts {
        let prompt = self.prompt.load(Ordering::SeqCst);
        let completion = self.completion.load(Ordering::SeqCst);
        TokenCounts::new(prompt + completion, prompt, completion)
    }
}

/// Production generator: an `LlmService` plus a usage meter
pub struct MeteredGenerator {
    service: Arc<dyn LlmService>,
    meter: UsageMeter,
    model_id: String,
}

impl MeteredGenerator {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        let model_id = service.model_id().to_string();
        Self {
            service,
            meter: UsageMeter::default(),
            model_id,
        }
    }

    fn build_request(&self, context: &[Message], user_text: &str) -> LlmRequest {
        let mut messages: Vec<LlmMessage> = context.iter().map(to_llm_message).collect();
        messages.push(LlmMessage::user(user_text));
        LlmRequest {
            system: Some(SYSTEM_PROMPT.to_string()),
            messages,
            max_tokens: None,
        }
    }
}

fn to_llm_message(message: &Message) -> LlmMessage {
    match message.role {
        Role::Human => LlmMessage::user(message.content.clone()),
        Role::Assistant => LlmMessage::assistant(message.content.clone()),
    }
}

#[async_trait]
impl Generator for MeteredGenerator {
    async fn generate(
        &self,
        context: &[Message],
        user_text: &str,
    ) -> Result<Generation, LlmError> {
        let request = self.build_request(context, user_text);
        let response = self.service.complete(&request).await?;
        if response.usage.is_zero() {
            tracing::warn!(model = %self.model_id, "Provider reported no token usage");
        }
        let usage = self
            .meter
            .add(response.usage.input_tokens, response.usage.output_tokens);
        Ok(Generation {
            response_text: response.text,
            usage,
        })
    }

    fn cumulative_usage(&self) -> TokenCounts {
        self.meter.read()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
