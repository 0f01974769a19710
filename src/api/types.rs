//! API request and response types

use crate::history::{Message, VersionIndex, VersionSummary};
use crate::ledger::{TokenCounts, UsageSeries};
use serde::{Deserialize, Serialize};

/// Request to create a new session
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub model: Option<String>,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// The index may be negative; the session rejects it as invalid
#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    pub index: i64,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    pub label: String,
}

/// Request to delete messages by position in the live transcript.
/// Negative positions are dropped like any other out-of-range position.
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub indexes: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub id: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub messages: Vec<Message>,
    pub current_version: VersionIndex,
}

#[derive(Debug, Serialize)]
pub struct VersionListResponse {
    pub versions: Vec<VersionSummary>,
    pub current_version: VersionIndex,
}

#[derive(Debug, Serialize)]
pub struct VersionMessagesResponse {
    pub index: VersionIndex,
    pub messages: Vec<Message>,
}

/// Response for a completed chat turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub assistant_text: String,
    pub version: VersionIndex,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub current_version: VersionIndex,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub version: VersionIndex,
    pub created: bool,
}

/// Either the new version or a no-op marker
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DeleteResponse {
    Deleted { version: VersionIndex },
    NoOp { noop: bool },
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    #[serde(flatten)]
    pub series: UsageSeries,
    pub consumed: TokenCounts,
}

#[derive(Debug, Serialize)]
pub struct ChangeLogResponse {
    pub entries: Vec<String>,
}

/// Model information with metadata
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub provider: String,
    pub description: String,
    pub context_window: usize,
}

/// Response for model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
