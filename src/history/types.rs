//! Conversation history value types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Position of a version in the version list. Index is identity.
pub type VersionIndex = usize;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Assistant,
}

/// A single immutable turn fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Point-in-time snapshot of a transcript.
///
/// Owns its own copy of the messages; nothing hands out a mutable
/// reference to them once the version is in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub label: String,
    messages: Vec<Message>,
}

impl Version {
    pub(super) fn new(label: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            label: label.into(),
            messages,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Audit marker attached to a version index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionTag {
    /// Named save point
    Snapshot,
    /// Produced by a selective delete
    Deleted,
    /// Target of at least one restore
    Restored,
    /// Copy of a restored version appended by the restore itself
    RestorePoint,
}

/// Listing row for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSummary {
    pub index: VersionIndex,
    pub label: String,
    pub message_count: usize,
    pub is_current: bool,
    pub tags: BTreeSet<VersionTag>,
}
