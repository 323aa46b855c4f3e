mod normalize;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::*;

pub use normalize::normalize_tree;

/// Raw input for the store: the category tree plus data supplied next to it.
///
/// `historical_versions` and `version_history` are keyed by instance id. They
/// are merged into the matching instances during normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeInput {
    pub categories: Vec<Category>,
    #[serde(default)]
    pub historical_versions: BTreeMap<String, Vec<VersionSnapshot>>,
    #[serde(default)]
    pub version_history: BTreeMap<String, Vec<VersionHistoryEntry>>,
}

/// Errors raised while building the store.
///
/// These mean the input data is malformed, so they are fatal. Runtime
/// lookups of unknown ids are not errors and never produce one of these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read data set: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse data set: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Instance {instance_id} has an empty version label")]
    EmptyVersion { instance_id: String },

    #[error("Version data supplied for unknown instance: {0}")]
    UnknownInstance(String),

    #[error(
        "File {file_id} ({instance_id}@{version}) has a preview variant for condition {condition_id}, which the file does not reference"
    )]
    UnknownVariantCondition {
        instance_id: String,
        version: String,
        file_id: String,
        condition_id: String,
    },
}

/// The read-only system of record.
///
/// Built once from static input; every version snapshot is derived eagerly at
/// construction. All accessors hand out shared references, so nothing a
/// caller receives can be changed behind its back.
#[derive(Debug, Clone)]
pub struct Store {
    categories: Vec<Category>,
    index: BTreeMap<String, (usize, usize)>,
}

/// The snapshot that backs an instance view for a requested version.
#[derive(Debug, Clone, Copy)]
pub struct ActiveSnapshot<'a> {
    pub category: &'a Category,
    pub instance: &'a Instance,
    pub snapshot: &'a VersionSnapshot,
    /// The requested label had no snapshot; `snapshot` is the current version.
    pub fell_back: bool,
}

impl<'a> ActiveSnapshot<'a> {
    pub fn version(&self) -> &'a str {
        &self.snapshot.version
    }

    pub fn folders(&self) -> &'a [Folder] {
        &self.snapshot.folders
    }

    pub fn folder(&self, folder_id: &str) -> Option<&'a Folder> {
        self.snapshot.folder(folder_id)
    }

    /// Every file of the snapshot, in folder order.
    pub fn files(&self) -> impl Iterator<Item = &'a File> + 'a {
        self.snapshot.folders.iter().flat_map(|f| f.files.iter())
    }

    /// Condition definition as this instance declares it.
    pub fn condition(&self, condition_id: &str) -> Option<&'a Condition> {
        let instance = self.instance;
        self.snapshot
            .condition(condition_id)
            .or_else(|| instance.conditions.iter().find(|c| c.id == condition_id))
    }
}

/// Totals reported after a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub categories: usize,
    pub instances: usize,
    pub snapshots: usize,
    pub folders: usize,
    pub files: usize,
}

impl Store {
    pub fn from_input(input: TreeInput) -> Result<Self, StoreError> {
        let categories = normalize_tree(input)?;
        let index = normalize::build_index(&categories);
        let store = Self { categories, index };

        let stats = store.stats();
        tracing::info!(
            categories = stats.categories,
            instances = stats.instances,
            snapshots = stats.snapshots,
            files = stats.files,
            "Loaded simulation tree"
        );
        Ok(store)
    }

    pub fn from_categories(categories: Vec<Category>) -> Result<Self, StoreError> {
        Self::from_input(TreeInput {
            categories,
            ..Default::default()
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let input: TreeInput = serde_json::from_str(json)?;
        Self::from_input(input)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    // ============================================================
    // Lookups
    // ============================================================

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn instance(&self, id: &str) -> Option<&Instance> {
        self.locate(id).map(|(_, instance)| instance)
    }

    /// The category that owns instance `id`.
    pub fn category_of(&self, instance_id: &str) -> Option<&Category> {
        self.locate(instance_id).map(|(category, _)| category)
    }

    fn locate(&self, instance_id: &str) -> Option<(&Category, &Instance)> {
        let &(ci, ii) = self.index.get(instance_id)?;
        let category = self.categories.get(ci)?;
        Some((category, category.instances.get(ii)?))
    }

    /// Resolve the snapshot backing `instance_id` at `version`.
    ///
    /// `None` (or an unknown label) resolves to the current version; the
    /// latter case is flagged with `fell_back` so callers can raise a notice.
    /// Returns `None` only when the instance itself does not exist.
    pub fn resolve(&self, instance_id: &str, version: Option<&str>) -> Option<ActiveSnapshot<'_>> {
        let (category, instance) = self.locate(instance_id)?;

        if let Some(snapshot) = version.and_then(|v| instance.versions.get(v)) {
            return Some(ActiveSnapshot {
                category,
                instance,
                snapshot,
                fell_back: false,
            });
        }

        let snapshot = instance.versions.get(&instance.version)?;
        Some(ActiveSnapshot {
            category,
            instance,
            snapshot,
            fell_back: version.is_some_and(|v| v != instance.version),
        })
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            categories: self.categories.len(),
            ..Default::default()
        };
        for instance in self.categories.iter().flat_map(|c| &c.instances) {
            stats.instances += 1;
            stats.snapshots += instance.versions.len();
            stats.folders += instance.folders.len();
            stats.files += instance.folders.iter().map(|f| f.files.len()).sum::<usize>();
        }
        stats
    }
}
