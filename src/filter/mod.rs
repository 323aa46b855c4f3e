//! Multi-criteria filtering over files, folders and instances.
//!
//! One [`Criteria`] (search keyword + [`Filter`] + reference time) is applied at
//! three granularities:
//!
//! - **Files** match when every constraint holds.
//! - **Folders** are included when any file matches, when the folder's own
//!   name or description matches the keyword, or when nothing is constrained.
//! - **Instances** are included when their own facets match together with a
//!   keyword found in their own text or in any file of the active snapshot, or
//!   when any file in their active snapshot matches outright.
//!
//! Empty constraint sets mean "match everything". No function here reorders
//! its input.

mod pagination;

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::*;
use crate::store::ActiveSnapshot;

pub use pagination::*;

/// Window applied to a record's most recent activity timestamp.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::Last90Days => "90d",
            Self::All => "all",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "7d" => Some(Self::Last7Days),
            "30d" => Some(Self::Last30Days),
            "90d" => Some(Self::Last90Days),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn window(&self) -> Option<Duration> {
        match self {
            Self::Last7Days => Some(Duration::days(7)),
            Self::Last30Days => Some(Duration::days(30)),
            Self::Last90Days => Some(Duration::days(90)),
            Self::All => None,
        }
    }

    /// Whether `latest` falls inside the window ending at `now`.
    ///
    /// An unknown time only satisfies `All`.
    pub fn admits(&self, latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self.window() {
            None => true,
            Some(window) => latest.is_some_and(|t| t >= now - window),
        }
    }
}

/// The structured part of the active filter.
///
/// Statuses hold the lowercase wire names of either file statuses
/// (`completed`, `running`, ...) or instance statuses (`approved`,
/// `in-progress`, ...); each granularity checks the ones it understands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default)]
    pub statuses: BTreeSet<String>,
    #[serde(default)]
    pub owners: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub time_range: TimeRange,
}

impl Filter {
    /// True when no structured constraint is set.
    pub fn is_unconstrained(&self) -> bool {
        self.statuses.is_empty()
            && self.owners.is_empty()
            && self.tags.is_empty()
            && self.time_range == TimeRange::All
    }

    /// Apply a partial update. Fields left as `None` keep their value.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(statuses) = patch.statuses {
            self.statuses = statuses
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(owners) = patch.owners {
            self.owners = owners;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(time_range) = patch.time_range {
            self.time_range = time_range;
        }
    }

    fn status_admits(&self, status: &str) -> bool {
        self.statuses.is_empty() || self.statuses.contains(status)
    }

    fn owner_admits(&self, owner: &str) -> bool {
        self.owners.is_empty() || self.owners.contains(owner)
    }

    fn tags_admit(&self, tags: &[String]) -> bool {
        self.tags.is_empty() || tags.iter().any(|t| self.tags.contains(t))
    }
}

/// Partial filter update. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPatch {
    pub statuses: Option<BTreeSet<String>>,
    pub owners: Option<BTreeSet<String>>,
    pub tags: Option<BTreeSet<String>>,
    pub time_range: Option<TimeRange>,
}

/// Everything a match decision depends on.
#[derive(Debug, Clone)]
pub struct Criteria<'a> {
    keyword: String,
    filter: &'a Filter,
    now: DateTime<Utc>,
}

impl<'a> Criteria<'a> {
    pub fn new(keyword: &str, filter: &'a Filter, now: DateTime<Utc>) -> Self {
        Self {
            keyword: keyword.trim().to_lowercase(),
            filter,
            now,
        }
    }

    /// True when any constraint (keyword included) is set.
    pub fn is_active(&self) -> bool {
        !self.keyword.is_empty() || !self.filter.is_unconstrained()
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Case-insensitive keyword test over `fields`. An empty keyword matches.
    pub fn keyword_matches<'s>(&self, fields: impl IntoIterator<Item = &'s str>) -> bool {
        self.keyword.is_empty()
            || fields
                .into_iter()
                .any(|f| f.to_lowercase().contains(&self.keyword))
    }

    /// Same as [`keyword_matches`](Self::keyword_matches) but false for an
    /// empty keyword, for "matched on its own text" checks.
    fn keyword_hits<'s>(&self, fields: impl IntoIterator<Item = &'s str>) -> bool {
        !self.keyword.is_empty() && self.keyword_matches(fields)
    }

    /// Keyword test alone over a file's name, type, description and tags.
    pub fn file_keyword_matches(&self, file: &File) -> bool {
        let text = [file.name.as_str(), file.file_type.as_str()]
            .into_iter()
            .chain(file.description.as_deref())
            .chain(file.tags.iter().map(String::as_str));
        self.keyword_matches(text)
    }

    pub fn file_matches(&self, file: &File) -> bool {
        self.file_keyword_matches(file)
            && self.filter.status_admits(file.status.as_str())
            && self.filter.owner_admits(&file.created_by)
            && self.filter.tags_admit(&file.tags)
            && self
                .filter
                .time_range
                .admits(latest_timestamp(file.activity_timestamps()), self.now)
    }
}

// ============================================================
// Folders
// ============================================================

/// Why a folder or instance made it into a filtered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Inclusion {
    /// No constraint is active; everything is shown.
    Unfiltered,
    /// At least one descendant file matches.
    FileMatch,
    /// The node's own text or facets match.
    SelfMatch,
}

/// A folder that survived filtering, with the files to display for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderView<'a> {
    #[serde(skip)]
    pub folder: &'a Folder,
    pub id: &'a str,
    pub name: &'a str,
    #[serde(rename = "type")]
    pub folder_type: FolderType,
    pub inclusion: Inclusion,
    /// Files matching the criteria, in folder order.
    pub matching_files: usize,
    /// Status histogram over all of the folder's files.
    pub status_summary: StatusSummary,
    pub files: Vec<&'a File>,
}

/// Decide whether `folder` is shown and which of its files are listed.
///
/// A folder included only because its own name or description matched the
/// keyword lists all of its files rather than none.
pub fn folder_view<'a>(folder: &'a Folder, criteria: &Criteria<'_>) -> Option<FolderView<'a>> {
    let view = |inclusion, matching_files, files| FolderView {
        folder,
        id: &folder.id,
        name: &folder.name,
        folder_type: folder.folder_type,
        inclusion,
        matching_files,
        status_summary: folder.status_histogram(),
        files,
    };

    if !criteria.is_active() {
        let files: Vec<&File> = folder.files.iter().collect();
        return Some(view(Inclusion::Unfiltered, files.len(), files));
    }

    let matching: Vec<&File> = folder
        .files
        .iter()
        .filter(|f| criteria.file_matches(f))
        .collect();
    if !matching.is_empty() {
        return Some(view(Inclusion::FileMatch, matching.len(), matching));
    }

    let own_text = std::iter::once(folder.name.as_str()).chain(folder.description.as_deref());
    if criteria.keyword_hits(own_text) {
        return Some(view(Inclusion::SelfMatch, 0, folder.files.iter().collect()));
    }

    None
}

/// Filter `folders`, preserving their order.
pub fn filter_folders<'a>(folders: &'a [Folder], criteria: &Criteria<'_>) -> Vec<FolderView<'a>> {
    folders
        .iter()
        .filter_map(|folder| folder_view(folder, criteria))
        .collect()
}

// ============================================================
// Instances
// ============================================================

/// An instance that survived filtering within its category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceView<'a> {
    #[serde(skip)]
    pub instance: &'a Instance,
    pub id: &'a str,
    pub name: &'a str,
    pub status: InstanceStatus,
    pub owner: &'a str,
    /// Version label of the snapshot the decision was made against.
    pub version: &'a str,
    pub inclusion: Inclusion,
    pub matching_files: usize,
}

/// Decide whether the instance behind `active` is shown.
///
/// Facets come from the active snapshot where it carries them, else from the
/// instance itself.
pub fn instance_view<'a>(active: &ActiveSnapshot<'a>, criteria: &Criteria<'_>) -> Option<InstanceView<'a>> {
    let instance = active.instance;
    let snapshot = active.snapshot;

    let status = snapshot.status.unwrap_or(instance.status);
    let owner = snapshot.owner.as_deref().unwrap_or(&instance.owner);
    let tags = snapshot.tags.as_deref().unwrap_or(&instance.tags);
    let summary = snapshot.summary.as_deref().or(instance.summary.as_deref());

    let matching_files = active.files().filter(|f| criteria.file_matches(f)).count();
    let view = |inclusion| InstanceView {
        instance,
        id: &instance.id,
        name: &instance.name,
        status,
        owner,
        version: active.version(),
        inclusion,
        matching_files,
    };

    if !criteria.is_active() {
        return Some(view(Inclusion::Unfiltered));
    }

    let text = std::iter::once(instance.name.as_str())
        .chain(summary)
        .chain(tags.iter().map(String::as_str));
    let latest = latest_timestamp(
        snapshot
            .updated_at
            .as_deref()
            .into_iter()
            .chain(snapshot.created_at.as_deref())
            .chain(instance.updated_at.as_deref())
            .chain(instance.created_at.as_deref()),
    );
    let filter = criteria.filter;
    let facets_match = filter.status_admits(status.as_str())
        && filter.owner_admits(owner)
        && filter.tags_admit(tags)
        && filter.time_range.admits(latest, criteria.now);

    // The keyword may be satisfied by any file of the snapshot while the
    // facets are satisfied by the instance itself.
    if facets_match && criteria.keyword_matches(text) {
        Some(view(Inclusion::SelfMatch))
    } else if matching_files > 0
        || (facets_match && active.files().any(|f| criteria.file_keyword_matches(f)))
    {
        Some(view(Inclusion::FileMatch))
    } else {
        None
    }
}
