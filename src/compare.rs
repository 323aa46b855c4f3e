//! The compare queue: a bounded, deduplicated working set of file references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of entries the queue accepts.
pub const COMPARE_CAPACITY: usize = 6;

/// Where a file lives in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub instance_id: String,
    pub version: String,
    pub folder_id: String,
    pub file_id: String,
    pub file_name: String,
}

/// A queued file, optionally scoped to one condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareEntry {
    #[serde(flatten)]
    pub file: FileRef,
    pub condition_id: Option<String>,
    /// `file_id`, or `file_id::condition_id` when condition-scoped.
    pub compare_key: String,
}

impl CompareEntry {
    pub fn new(file: FileRef, condition_id: Option<String>) -> Self {
        let compare_key = compare_key(&file.file_id, condition_id.as_deref());
        Self {
            file,
            condition_id,
            compare_key,
        }
    }

    /// Display label, e.g. `thrust.csv @ cond-2`.
    pub fn label(&self) -> String {
        match &self.condition_id {
            Some(condition) => format!("{} @ {}", self.file.file_name, condition),
            None => self.file.file_name.clone(),
        }
    }
}

/// Identity key used for queue deduplication.
pub fn compare_key(file_id: &str, condition_id: Option<&str>) -> String {
    match condition_id {
        Some(condition) => format!("{}::{}", file_id, condition),
        None => file_id.to_string(),
    }
}

/// The entry point an add came through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompareEventKind {
    File,
    Folder,
    Instance,
}

/// What triggered a batch of adds, echoed back in the confirmation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareOrigin {
    pub kind: CompareEventKind,
    pub id: String,
    pub label: String,
}

/// Confirmation of the most recent successful add.
///
/// `sequence` increases with every successful add, so a UI can tell two
/// identical-looking confirmations apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareEvent {
    pub kind: CompareEventKind,
    pub id: String,
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareQueue {
    entries: Vec<CompareEntry>,
    last_event: Option<CompareEvent>,
    sequence: u64,
}

impl CompareQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `entry` unless its key is already present or the queue is full.
    ///
    /// Rejection is silent: the return value and the queue contents are the
    /// only feedback.
    pub fn add(&mut self, entry: CompareEntry, origin: &CompareOrigin, now: DateTime<Utc>) -> bool {
        if self.is_full() || self.contains(&entry.compare_key) {
            return false;
        }

        self.sequence += 1;
        self.last_event = Some(CompareEvent {
            kind: origin.kind,
            id: origin.id.clone(),
            label: origin.label.clone(),
            timestamp: now,
            sequence: self.sequence,
        });
        self.entries.push(entry);
        true
    }

    pub fn remove(&mut self, compare_key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.compare_key != compare_key);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[CompareEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= COMPARE_CAPACITY
    }

    pub fn contains(&self, compare_key: &str) -> bool {
        self.entries.iter().any(|e| e.compare_key == compare_key)
    }

    pub fn last_event(&self) -> Option<&CompareEvent> {
        self.last_event.as_ref()
    }
}
