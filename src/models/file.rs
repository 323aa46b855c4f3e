use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::preview::{CurveSeries, Preview};

/// A single artifact produced or consumed by a simulation run.
///
/// Files carry optional per-condition preview variants. When a file was run
/// under several operating conditions, `condition_variants` maps each
/// condition id to the preview for that run, and `preview` holds the
/// unscoped default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub version: String,
    #[serde(default)]
    pub size: String,
    pub status: FileStatus,
    pub created_by: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ids of the conditions this file was produced under.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Condition id → preview for that condition. Every key must also appear
    /// in `conditions`; the store rejects files that break this at load.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub condition_variants: BTreeMap<String, Preview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
}

impl File {
    pub fn references_condition(&self, condition_id: &str) -> bool {
        self.conditions.iter().any(|c| c == condition_id)
    }

    /// The preview to show for `condition_id`: its variant if one exists,
    /// else the base preview.
    pub fn preview_for(&self, condition_id: Option<&str>) -> Option<&Preview> {
        condition_id
            .and_then(|id| self.condition_variants.get(id))
            .or(self.preview.as_ref())
    }

    /// First curve series for `condition_id`, falling back to the base preview.
    pub fn curve_for(&self, condition_id: Option<&str>) -> Option<&CurveSeries> {
        self.preview_for(condition_id)
            .and_then(Preview::first_curve)
    }

    /// Timestamps in the order the time-range filter considers them.
    pub fn activity_timestamps(&self) -> impl Iterator<Item = &str> {
        self.last_run_at
            .as_deref()
            .into_iter()
            .chain(self.updated_at.as_deref())
            .chain(std::iter::once(self.created_at.as_str()))
    }
}

/// Run status of a file.
///
/// - `Draft`: Prepared but never executed
/// - `Running`: A job is currently producing this file
/// - `Completed`: Finished successfully
/// - `Failed`: Finished with an error
/// - `Archived`: Retained for reference only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Draft,
    Running,
    Completed,
    Failed,
    Archived,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Count of files per status, as carried by folders and snapshots.
pub type StatusSummary = BTreeMap<FileStatus, usize>;

/// Tally `files` by status.
pub fn summarize_statuses<'a>(files: impl IntoIterator<Item = &'a File>) -> StatusSummary {
    let mut summary = StatusSummary::new();
    for file in files {
        *summary.entry(file.status).or_default() += 1;
    }
    summary
}
