//! Load-time normalization and validation of the category tree.

use std::collections::{BTreeMap, HashSet};

use crate::models::*;

use super::{StoreError, TreeInput};

/// Normalize every instance in `input` and validate the result.
///
/// Safe to run on a tree that has already been normalized: the current
/// snapshot is rebuilt from the instance's own fields, historical snapshots
/// are only inserted under labels that are still free, and history entries are
/// deduplicated by label.
pub fn normalize_tree(input: TreeInput) -> Result<Vec<Category>, StoreError> {
    let TreeInput {
        mut categories,
        mut historical_versions,
        mut version_history,
    } = input;

    let known: HashSet<&str> = categories
        .iter()
        .flat_map(|c| c.instances.iter().map(|i| i.id.as_str()))
        .collect();
    if let Some(id) = historical_versions
        .keys()
        .chain(version_history.keys())
        .find(|id| !known.contains(id.as_str()))
    {
        return Err(StoreError::UnknownInstance(id.clone()));
    }

    for category in &mut categories {
        for instance in &mut category.instances {
            let historical = historical_versions.remove(&instance.id).unwrap_or_default();
            let history = version_history.remove(&instance.id).unwrap_or_default();
            normalize_instance(instance, historical, history)?;
        }
    }

    validate_tree(&categories)?;
    Ok(categories)
}

fn normalize_instance(
    instance: &mut Instance,
    historical: Vec<VersionSnapshot>,
    history: Vec<VersionHistoryEntry>,
) -> Result<(), StoreError> {
    if instance.version.trim().is_empty() {
        return Err(StoreError::EmptyVersion {
            instance_id: instance.id.clone(),
        });
    }

    let current = instance.version.clone();
    tag_folders(&mut instance.folders, &current);
    instance
        .versions
        .insert(current.clone(), instance.current_snapshot());

    for snapshot in historical {
        if snapshot.version == current {
            tracing::debug!(
                instance = %instance.id,
                version = %current,
                "Ignoring historical snapshot that shadows the current version"
            );
            continue;
        }
        instance
            .versions
            .entry(snapshot.version.clone())
            .or_insert(snapshot);
    }

    for (label, snapshot) in instance.versions.iter_mut() {
        if snapshot.version != *label {
            snapshot.version = label.clone();
        }
        tag_folders(&mut snapshot.folders, label);
    }

    for entry in history {
        if !instance
            .version_history
            .iter()
            .any(|e| e.version == entry.version)
        {
            instance.version_history.push(entry);
        }
    }

    Ok(())
}

fn tag_folders(folders: &mut [Folder], version: &str) {
    for folder in folders {
        folder.belongs_to_version = Some(version.to_string());
    }
}

fn validate_tree(categories: &[Category]) -> Result<(), StoreError> {
    let mut category_ids = HashSet::new();
    let mut instance_ids = HashSet::new();

    for category in categories {
        if !category_ids.insert(category.id.as_str()) {
            return Err(StoreError::DuplicateId {
                kind: "category",
                id: category.id.clone(),
            });
        }

        for instance in &category.instances {
            if !instance_ids.insert(instance.id.as_str()) {
                return Err(StoreError::DuplicateId {
                    kind: "instance",
                    id: instance.id.clone(),
                });
            }
            for snapshot in instance.versions.values() {
                validate_snapshot(&instance.id, snapshot)?;
            }
        }
    }

    Ok(())
}

fn validate_snapshot(instance_id: &str, snapshot: &VersionSnapshot) -> Result<(), StoreError> {
    let mut folder_ids = HashSet::new();
    for folder in &snapshot.folders {
        if !folder_ids.insert(folder.id.as_str()) {
            return Err(StoreError::DuplicateId {
                kind: "folder",
                id: format!("{}@{}/{}", instance_id, snapshot.version, folder.id),
            });
        }

        for file in &folder.files {
            if let Some(condition_id) = unknown_variant_key(file) {
                return Err(StoreError::UnknownVariantCondition {
                    instance_id: instance_id.to_string(),
                    version: snapshot.version.clone(),
                    file_id: file.id.clone(),
                    condition_id: condition_id.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn unknown_variant_key(file: &File) -> Option<&str> {
    file.condition_variants
        .keys()
        .find(|key| !file.references_condition(key))
        .map(String::as_str)
}

/// Map of instance id → position in the tree, for O(1) lookups.
pub(super) fn build_index(categories: &[Category]) -> BTreeMap<String, (usize, usize)> {
    let mut index = BTreeMap::new();
    for (ci, category) in categories.iter().enumerate() {
        for (ii, instance) in category.instances.iter().enumerate() {
            index.insert(instance.id.clone(), (ci, ii));
        }
    }
    index
}
