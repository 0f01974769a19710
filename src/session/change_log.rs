//! Human-readable audit trail of session mutations

use crate::history::{VersionIndex, TIMESTAMP_FORMAT};
use chrono::{DateTime, Local};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Initialized,
    Appended {
        version: VersionIndex,
    },
    Snapshot {
        version: VersionIndex,
        label: String,
    },
    Restored {
        version: VersionIndex,
        label: String,
    },
    RestorePoint {
        version: VersionIndex,
        from: VersionIndex,
    },
    Deleted {
        removed: usize,
        version: VersionIndex,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Initialized => write!(f, "Initialized Chat"),
            Change::Appended { version } => {
                write!(f, "New chat version created (Version {version})")
            }
            Change::Snapshot { version, label } => {
                write!(f, "Saved version \"{label}\" (Version {version})")
            }
            Change::Restored { version, label } => {
                write!(f, "Restored to Version {version} ({label})")
            }
            Change::RestorePoint { version, from } => {
                write!(f, "New chat version created from Version {from} (Version {version})")
            }
            Change::Deleted { removed, version } => {
                write!(f, "Deleted {removed} message(s), created Version {version}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeEntry {
    pub at: DateTime<Local>,
    pub change: Change,
}

impl fmt::Display for ChangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format(TIMESTAMP_FORMAT), self.change)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    entries: Vec<ChangeEntry>,
}

impl ChangeLog {
    pub fn push(&mut self, change: Change) {
        self.entries.push(ChangeEntry {
            at: Local::now(),
            change,
        });
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}
