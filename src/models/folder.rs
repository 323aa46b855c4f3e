use serde::{Deserialize, Serialize};

use super::file::{summarize_statuses, File, StatusSummary};

/// A typed grouping of files inside an instance or a version snapshot.
///
/// Folders are never shared: each snapshot owns its own copy, tagged with the
/// version it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub folder_type: FolderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_summary: Option<StatusSummary>,
    /// Version label of the snapshot that owns this folder. Set by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub belongs_to_version: Option<String>,
}

impl Folder {
    pub fn file(&self, file_id: &str) -> Option<&File> {
        self.files.iter().find(|f| f.id == file_id)
    }

    /// The declared histogram, or one tallied from the files when absent.
    pub fn status_histogram(&self) -> StatusSummary {
        self.status_summary
            .clone()
            .unwrap_or_else(|| summarize_statuses(&self.files))
    }
}

/// What kind of artifacts a folder groups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FolderType {
    Geometry,
    Model,
    Document,
    Result,
    Report,
    Dataset,
}

impl FolderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Model => "model",
            Self::Document => "document",
            Self::Result => "result",
            Self::Report => "report",
            Self::Dataset => "dataset",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}
