//! Mock generator for testing
//!
//! Replays queued replies and advances a never-reset counter the way a
//! real metered client would.

use super::generator::{Generation, Generator, UsageMeter};
use crate::history::Message;
use crate::ledger::TokenCounts;
use crate::llm::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Queued outcome of one call: reply text plus the call's own usage
type Scripted = Result<(String, u64, u64), LlmError>;

pub struct MockGenerator {
    responses: Mutex<VecDeque<Scripted>>,
    meter: UsageMeter,
    delay: Option<Duration>,
    /// Every call's context and user text
    calls: Mutex<Vec<(Vec<Message>, String)>>,
    /// Notified when a call starts (for cancellation tests)
    pub call_started: Arc<Notify>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            meter: UsageMeter::default(),
            delay: None,
            calls: Mutex::new(Vec::new()),
            call_started: Arc::new(Notify::new()),
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_reply(&self, text: &str, prompt_tokens: u64, completion_tokens: u64) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok((text.to_string(), prompt_tokens, completion_tokens)));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_calls(&self) -> Vec<(Vec<Message>, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(
        &self,
        context: &[Message],
        user_text: &str,
    ) -> Result<Generation, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((context.to_vec(), user_text.to_string()));
        self.call_started.notify_one();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")));
        let (response_text, prompt, completion) = next?;

        Ok(Generation {
            response_text,
            usage: self.meter.add(prompt, completion),
        })
    }

    fn cumulative_usage(&self) -> TokenCounts {
        self.meter.read()
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
