//! History store
//!
//! Owns the live transcript and the append-only version list. Every
//! structural change to the live transcript (append, delete) produces
//! exactly one new version; restore only moves the live transcript and
//! the current pointer.

mod types;

#[cfg(test)]
mod proptests;

pub use types::{Message, Role, Version, VersionIndex, VersionSummary, VersionTag};

use chrono::Local;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Format used for version labels and change log lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time as a version label
pub fn timestamp_label() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("Invalid version index {index} (have {count} versions)")]
    InvalidVersion { index: i64, count: usize },
    #[error("Nothing to delete")]
    NoOp,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    live: Vec<Message>,
    versions: Vec<Version>,
    current: VersionIndex,
    tags: BTreeMap<VersionIndex, BTreeSet<VersionTag>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    /// Create a store holding the empty pre-conversation version 0
    pub fn new() -> Self {
        Self::with_initial_label(timestamp_label())
    }

    pub fn with_initial_label(label: impl Into<String>) -> Self {
        Self {
            live: Vec::new(),
            versions: vec![Version::new(label, Vec::new())],
            current: 0,
            tags: BTreeMap::new(),
        }
    }

    pub fn live_transcript(&self) -> &[Message] {
        &self.live
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn version(&self, index: VersionIndex) -> Result<&Version, HistoryError> {
        self.versions.get(index).ok_or(HistoryError::InvalidVersion {
            index: i64::try_from(index).unwrap_or(i64::MAX),
            count: self.versions.len(),
        })
    }

    /// Check a caller-supplied (possibly negative) index against the
    /// version list
    pub fn resolve_index(&self, index: i64) -> Result<VersionIndex, HistoryError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.versions.len())
            .ok_or(HistoryError::InvalidVersion {
                index,
                count: self.versions.len(),
            })
    }

    pub fn current_version_index(&self) -> VersionIndex {
        self.current
    }

    pub fn tags(&self, index: VersionIndex) -> BTreeSet<VersionTag> {
        self.tags.get(&index).cloned().unwrap_or_default()
    }

    pub fn tag(&mut self, index: VersionIndex, tag: VersionTag) {
        if index < self.versions.len() {
            self.tags.entry(index).or_default().insert(tag);
        }
    }

    pub fn summaries(&self) -> Vec<VersionSummary> {
        self.versions
            .iter()
            .enumerate()
            .map(|(index, version)| VersionSummary {
                index,
                label: version.label.clone(),
                message_count: version.messages().len(),
                is_current: index == self.current,
                tags: self.tags(index),
            })
            .collect()
    }

    /// Append a completed turn and record the result as a new version
    pub fn append(&mut self, user: Message, assistant: Message) -> VersionIndex {
        self.live.push(user);
        self.live.push(assistant);
        self.push_version(timestamp_label())
    }

    /// Save the live transcript under `label` without changing it.
    ///
    /// An empty live transcript is not saved; the current index is
    /// returned unchanged.
    pub fn snapshot(&mut self, label: impl Into<String>) -> VersionIndex {
        if self.live.is_empty() {
            tracing::debug!("Skipping snapshot of empty transcript");
            return self.current;
        }
        self.push_version(label)
    }

    /// Replace the live transcript with a copy of version `index`.
    ///
    /// The version list is left untouched, so whatever was live before is
    /// gone unless it had already been appended or snapshotted.
    pub fn restore(&mut self, index: VersionIndex) -> Result<(), HistoryError> {
        let messages = self.version(index)?.messages().to_vec();
        self.live = messages;
        self.current = index;
        Ok(())
    }

    /// Drop the messages at `indexes` from the live transcript and record
    /// the reduced transcript as a new version.
    ///
    /// Out-of-range indexes are ignored. Fails with `NoOp` when nothing
    /// valid remains to delete.
    pub fn delete_messages(
        &mut self,
        indexes: impl IntoIterator<Item = usize>,
    ) -> Result<VersionIndex, HistoryError> {
        let len = self.live.len();
        let targets: HashSet<usize> = indexes.into_iter().filter(|&i| i < len).collect();
        if targets.is_empty() {
            return Err(HistoryError::NoOp);
        }

        let kept: Vec<Message> = std::mem::take(&mut self.live)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !targets.contains(i))
            .map(|(_, m)| m)
            .collect();
        self.live = kept;

        let index = self.push_version(timestamp_label());
        self.tag(index, VersionTag::Deleted);
        Ok(index)
    }

    fn push_version(&mut self, label: impl Into<String>) -> VersionIndex {
        self.versions.push(Version::new(label, self.live.clone()));
        self.current = self.versions.len() - 1;
        self.current
    }
}
