use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::file::StatusSummary;
use super::folder::Folder;
use super::timestamp::parse_timestamp;

/// A top-level grouping of simulation instances (e.g. "Combustor CFD").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

/// One simulation record, versioned over time.
///
/// The top-level `conditions`, `resource_usage` and `folders` describe the
/// current version. Once the store has normalized an instance, `versions`
/// always holds an entry keyed by `version` that mirrors those fields, plus
/// any historical snapshots supplied with the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub version: String,
    pub status: InstanceStatus,
    pub owner: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub resource_usage: ResourceUsage,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version_history: Vec<VersionHistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Instance {
    /// Build the snapshot of the current version from the instance's own fields.
    pub fn current_snapshot(&self) -> VersionSnapshot {
        VersionSnapshot {
            version: self.version.clone(),
            summary: self.summary.clone(),
            resource_usage: self.resource_usage.clone(),
            conditions: self.conditions.clone(),
            folders: self.folders.clone(),
            highlights: Vec::new(),
            status_summary: None,
            status: Some(self.status),
            tags: Some(self.tags.clone()),
            owner: Some(self.owner.clone()),
            reviewers: Vec::new(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    pub fn snapshot(&self, version: &str) -> Option<&VersionSnapshot> {
        self.versions.get(version)
    }

    /// Version labels from oldest to newest.
    ///
    /// Ordering comes from `version_history` (date, then label). Labels the
    /// history does not mention follow in map order. Without any history the
    /// map order is used as is.
    pub fn ordered_version_labels(&self) -> Vec<&str> {
        let mut history: Vec<&VersionHistoryEntry> = self
            .version_history
            .iter()
            .filter(|entry| self.versions.contains_key(&entry.version))
            .collect();
        history.sort_by(|a, b| {
            let (da, db) = (parse_timestamp(&a.date), parse_timestamp(&b.date));
            (da.is_none(), da, a.version.as_str()).cmp(&(db.is_none(), db, b.version.as_str()))
        });

        let mut labels: Vec<&str> = history.iter().map(|e| e.version.as_str()).collect();
        for label in self.versions.keys() {
            if !labels.contains(&label.as_str()) {
                labels.push(label.as_str());
            }
        }
        labels
    }

    /// The oldest known version, used as the default comparison baseline.
    pub fn baseline_version(&self) -> Option<&str> {
        self.ordered_version_labels().first().copied()
    }
}

/// Review status of a simulation instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceStatus {
    Approved,
    InProgress,
    Draft,
    Archived,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::InProgress => "in-progress",
            Self::Draft => "draft",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(Self::Approved),
            "in-progress" => Some(Self::InProgress),
            "draft" => Some(Self::Draft),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Compute resources consumed by a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_memory_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
}

/// An immutable copy of an instance's data at one version label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub resource_usage: ResourceUsage,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<HighlightMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_summary: Option<StatusSummary>,
    /// Facets that, when present, take precedence over the instance's own
    /// during instance-level filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InstanceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl VersionSnapshot {
    pub fn folder(&self, folder_id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == folder_id)
    }

    pub fn condition(&self, condition_id: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.id == condition_id)
    }
}

/// A headline number called out for a version (e.g. "Peak thrust +2.1%").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightMetric {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
}

/// An entry of the version-history list that orders an instance's snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistoryEntry {
    pub version: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}
