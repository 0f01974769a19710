//! Conversation session
//!
//! One `Session` per conversation. It owns the history store, the token
//! ledger and the change log, and is the only thing that talks to the
//! model collaborator. Callers serialize access; nothing here locks.

mod change_log;
mod generator;

#[cfg(test)]
pub mod testing;

pub use change_log::{Change, ChangeLog};
pub use generator::{Generator, MeteredGenerator};

use crate::history::{
    timestamp_label, HistoryError, HistoryStore, Message, VersionIndex, VersionSummary, VersionTag,
};
use crate::ledger::{TokenCounts, TokenLedger, UsageSeries};
use crate::llm::LlmError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// How a restore shows up in the version list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorePolicy {
    /// Only move the live transcript and the current pointer
    #[default]
    InPlace,
    /// Also append a copy of the restored transcript as a new version
    NewVersion,
}

impl RestorePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in_place" | "in-place" => Some(Self::InPlace),
            "new_version" | "new-version" => Some(Self::NewVersion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub restore_policy: RestorePolicy,
    pub generation_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restore_policy: RestorePolicy::default(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let restore_policy = match lookup("REWIND_RESTORE_POLICY") {
            Some(value) => RestorePolicy::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown REWIND_RESTORE_POLICY, using in_place");
                RestorePolicy::InPlace
            }),
            None => RestorePolicy::default(),
        };

        let generation_timeout = lookup("REWIND_GENERATION_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .map_or(DEFAULT_GENERATION_TIMEOUT, Duration::from_secs);

        Self {
            restore_policy,
            generation_timeout,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Model call failed: {0}")]
    ModelFailure(#[from] LlmError),
    #[error("Generation cancelled")]
    Cancelled,
}

/// Outcome of a completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub assistant_text: String,
    pub version: VersionIndex,
}

pub struct Session {
    id: String,
    config: SessionConfig,
    history: HistoryStore,
    ledger: TokenLedger,
    change_log: ChangeLog,
    generator: Arc<dyn Generator>,
}

impl Session {
    pub fn new(id: impl Into<String>, config: SessionConfig, generator: Arc<dyn Generator>) -> Self {
        let mut change_log = ChangeLog::default();
        change_log.push(Change::Initialized);
        Self {
            id: id.into(),
            config,
            history: HistoryStore::new(),
            ledger: TokenLedger::new(),
            change_log,
            generator,
        }
    }

    // ==================== Read side ====================

    pub fn live_transcript(&self) -> &[Message] {
        self.history.live_transcript()
    }

    pub fn list_versions(&self) -> Vec<VersionSummary> {
        self.history.summaries()
    }

    pub fn version_messages(&self, index: VersionIndex) -> Result<&[Message], HistoryError> {
        Ok(self.history.version(index)?.messages())
    }

    /// Validate an externally supplied version index
    pub fn resolve_version(&self, index: i64) -> Result<VersionIndex, HistoryError> {
        self.history.resolve_index(index)
    }

    pub fn current_version(&self) -> VersionIndex {
        self.history.current_version_index()
    }

    pub fn token_usage_series(&self) -> UsageSeries {
        self.ledger.series()
    }

    pub fn tokens_consumed(&self) -> TokenCounts {
        self.ledger.consumed()
    }

    pub fn change_log(&self) -> Vec<String> {
        self.change_log.lines()
    }

    // ==================== Mutations ====================

    /// Run one user turn through the model.
    ///
    /// State changes only after a successful reply; a failed, timed out or
    /// cancelled call leaves transcript, versions and ledger as they were.
    pub async fn submit_turn(&mut self, text: &str) -> Result<TurnOutcome, SessionError> {
        self.submit_turn_cancellable(text, CancellationToken::new())
            .await
    }

    pub async fn submit_turn_cancellable(
        &mut self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, SessionError> {
        let timeout = self.config.generation_timeout;
        let call = tokio::time::timeout(
            timeout,
            self.generator.generate(self.history.live_transcript(), text),
        );

        let generation = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!(session_id = %self.id, "Turn cancelled before reply");
                return Err(SessionError::Cancelled);
            }
            result = call => match result {
                Ok(Ok(generation)) => generation,
                Ok(Err(e)) => {
                    tracing::warn!(session_id = %self.id, error = %e, "Turn failed, state unchanged");
                    return Err(SessionError::ModelFailure(e));
                }
                Err(_) => {
                    tracing::warn!(
                        session_id = %self.id,
                        timeout_secs = timeout.as_secs(),
                        "Turn timed out, state unchanged"
                    );
                    return Err(SessionError::ModelFailure(LlmError::network(format!(
                        "Generation timed out after {}s",
                        timeout.as_secs()
                    ))));
                }
            }
        };

        let version = self.history.append(
            Message::human(text),
            Message::assistant(generation.response_text.clone()),
        );
        let entry = self.ledger.record(generation.usage);
        self.change_log.push(Change::Appended { version });

        tracing::info!(
            session_id = %self.id,
            version,
            delta_total = entry.delta.total,
            cumulative_total = entry.cumulative.total,
            "Turn appended"
        );

        Ok(TurnOutcome {
            assistant_text: generation.response_text,
            version,
        })
    }

    /// Save the live transcript under a name. Empty transcripts are not
    /// saved and the current index comes back unchanged.
    pub fn save_version(&mut self, label: &str) -> VersionIndex {
        let before = self.history.versions().len();
        let index = self.history.snapshot(label);
        if self.history.versions().len() > before {
            self.history.tag(index, VersionTag::Snapshot);
            self.change_log.push(Change::Snapshot {
                version: index,
                label: label.to_string(),
            });
            tracing::info!(session_id = %self.id, version = index, label, "Version saved");
        } else {
            tracing::warn!(session_id = %self.id, "Nothing to save, live transcript is empty");
        }
        index
    }

    /// Make version `index` the live transcript and re-base the ledger.
    ///
    /// Returns the version the session is on afterwards: `index` itself, or
    /// the appended copy under `RestorePolicy::NewVersion`.
    pub fn restore_version(&mut self, index: VersionIndex) -> Result<VersionIndex, HistoryError> {
        let label = self.history.version(index)?.label.clone();

        self.history.restore(index)?;
        self.history.tag(index, VersionTag::Restored);
        self.ledger.record_reset(self.generator.cumulative_usage());
        self.change_log.push(Change::Restored {
            version: index,
            label,
        });
        tracing::info!(session_id = %self.id, version = index, "Restored version");

        if self.config.restore_policy == RestorePolicy::NewVersion {
            let before = self.history.versions().len();
            let copy = self
                .history
                .snapshot(format!("Restored from Version {index} at {}", timestamp_label()));
            if self.history.versions().len() > before {
                self.history.tag(copy, VersionTag::RestorePoint);
                self.change_log.push(Change::RestorePoint {
                    version: copy,
                    from: index,
                });
            }
        }

        Ok(self.history.current_version_index())
    }

    /// Remove messages from the live transcript as a new version
    pub fn delete_messages(
        &mut self,
        indexes: impl IntoIterator<Item = usize>,
    ) -> Result<VersionIndex, HistoryError> {
        let before = self.history.live_transcript().len();
        match self.history.delete_messages(indexes) {
            Ok(version) => {
                let removed = before - self.history.live_transcript().len();
                self.change_log.push(Change::Deleted { removed, version });
                tracing::info!(session_id = %self.id, version, removed, "Deleted messages");
                Ok(version)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, "Delete request had no valid targets");
                Err(e)
            }
        }
    }
}
