//! Session state and the actions that change it.
//!
//! All mutation goes through [`reduce`], a pure function of the previous state,
//! the store and one [`Action`]. Replaying the same action log against the
//! same store and clock reproduces the same state.
//!
//! Unknown ids never fail an action. The selection stays where it was (or
//! falls back to the current version) and a transient [`Notice`] explains why.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compare::{CompareEntry, CompareEventKind, CompareOrigin, CompareQueue, FileRef};
use crate::filter::{clamp_page, filter_folders, folder_view, Criteria, Filter, FilterPatch, DEFAULT_PAGE_SIZE};
use crate::models::File;
use crate::store::{ActiveSnapshot, Store};

// ============================================================
// State
// ============================================================

/// What the user is currently looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Selection {
    #[default]
    NoSelection,
    CategorySelected {
        category_id: String,
    },
    InstanceSelected {
        category_id: String,
        instance_id: String,
        version: String,
    },
    FolderSelected {
        category_id: String,
        instance_id: String,
        version: String,
        folder_id: String,
    },
}

impl Selection {
    pub fn category_id(&self) -> Option<&str> {
        match self {
            Self::NoSelection => None,
            Self::CategorySelected { category_id }
            | Self::InstanceSelected { category_id, .. }
            | Self::FolderSelected { category_id, .. } => Some(category_id),
        }
    }

    pub fn instance_id(&self) -> Option<&str> {
        match self {
            Self::InstanceSelected { instance_id, .. } | Self::FolderSelected { instance_id, .. } => {
                Some(instance_id)
            }
            _ => None,
        }
    }

    /// Label of the snapshot backing the selected instance.
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::InstanceSelected { version, .. } | Self::FolderSelected { version, .. } => Some(version),
            _ => None,
        }
    }

    pub fn folder_id(&self) -> Option<&str> {
        match self {
            Self::FolderSelected { folder_id, .. } => Some(folder_id),
            _ => None,
        }
    }
}

/// A recoverable problem reported by the last action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Notice {
    CategoryNotFound { category_id: String },
    InstanceNotFound { instance_id: String },
    FolderNotFound { folder_id: String },
    VersionNotFound {
        instance_id: String,
        version: String,
        fallback: String,
    },
    FileNotFound { file_id: String },
    ConditionNotFound { condition_id: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CategoryNotFound { category_id } => write!(f, "Category not found: {}", category_id),
            Self::InstanceNotFound { instance_id } => write!(f, "Instance not found: {}", instance_id),
            Self::FolderNotFound { folder_id } => write!(f, "Folder not found: {}", folder_id),
            Self::VersionNotFound {
                instance_id,
                version,
                fallback,
            } => write!(
                f,
                "Version {} not found for {}, showing {} instead",
                version, instance_id, fallback
            ),
            Self::FileNotFound { file_id } => write!(f, "File not found: {}", file_id),
            Self::ConditionNotFound { condition_id } => write!(f, "Condition not found: {}", condition_id),
        }
    }
}

/// Everything about a session that is not the store itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub selection: Selection,
    /// Version last chosen per instance id.
    pub versions: BTreeMap<String, String>,
    pub keyword: String,
    pub filter: Filter,
    /// 1-based page of the selected folder's file list.
    pub page: usize,
    pub page_size: usize,
    /// Condition scope for compare adds.
    pub active_condition: Option<String>,
    pub compare: CompareQueue,
    pub notice: Option<Notice>,
    pub has_interacted: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl SessionState {
    pub fn new(page_size: usize) -> Self {
        Self {
            selection: Selection::NoSelection,
            versions: BTreeMap::new(),
            keyword: String::new(),
            filter: Filter::default(),
            page: 1,
            page_size: page_size.max(1),
            active_condition: None,
            compare: CompareQueue::new(),
            notice: None,
            has_interacted: false,
        }
    }

    /// Filter criteria in effect at `now`.
    pub fn criteria(&self, now: DateTime<Utc>) -> Criteria<'_> {
        Criteria::new(&self.keyword, &self.filter, now)
    }

    /// The remembered version label for `instance_id`, if any.
    pub fn remembered_version(&self, instance_id: &str) -> Option<&str> {
        self.versions.get(instance_id).map(String::as_str)
    }
}

// ============================================================
// Actions
// ============================================================

/// A single-file compare request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub instance_id: String,
    /// Snapshot to take the file from; the remembered version when absent.
    #[serde(default)]
    pub version: Option<String>,
    pub folder_id: String,
    pub file_id: String,
    #[serde(default)]
    pub condition_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    SelectCategory(String),
    SelectInstance(String),
    SelectFolder(String),
    ChangeVersion { instance_id: String, version: String },
    SelectCondition(Option<String>),
    SetSearchKeyword(String),
    SetFilters(FilterPatch),
    SetPage(usize),
    SetPageSize(usize),
    AddToCompare(CompareRequest),
    AddFolderToCompare(String),
    AddInstanceToCompare(String),
    RemoveFromCompare(String),
    ClearCompare,
    DismissNotice,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectCategory(_) => "select_category",
            Self::SelectInstance(_) => "select_instance",
            Self::SelectFolder(_) => "select_folder",
            Self::ChangeVersion { .. } => "change_version",
            Self::SelectCondition(_) => "select_condition",
            Self::SetSearchKeyword(_) => "set_search_keyword",
            Self::SetFilters(_) => "set_filters",
            Self::SetPage(_) => "set_page",
            Self::SetPageSize(_) => "set_page_size",
            Self::AddToCompare(_) => "add_to_compare",
            Self::AddFolderToCompare(_) => "add_folder_to_compare",
            Self::AddInstanceToCompare(_) => "add_instance_to_compare",
            Self::RemoveFromCompare(_) => "remove_from_compare",
            Self::ClearCompare => "clear_compare",
            Self::DismissNotice => "dismiss_notice",
        }
    }
}

/// Inputs an action may read besides the previous state.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    pub store: &'a Store,
    pub now: DateTime<Utc>,
}

// ============================================================
// Reducer
// ============================================================

/// Apply `action` to `state`, returning the complete new state.
pub fn reduce(state: &SessionState, action: Action, ctx: &ActionContext<'_>) -> SessionState {
    let mut next = state.clone();
    next.notice = None;
    next.has_interacted = true;

    let name = action.name();
    match action {
        Action::SelectCategory(id) => select_category(&mut next, ctx, id),
        Action::SelectInstance(id) => select_instance(&mut next, ctx, id),
        Action::SelectFolder(id) => select_folder(&mut next, ctx, id),
        Action::ChangeVersion { instance_id, version } => change_version(&mut next, ctx, instance_id, version),
        Action::SelectCondition(id) => select_condition(&mut next, ctx, id),
        Action::SetSearchKeyword(keyword) => {
            next.keyword = keyword;
            clamp_stored_page(&mut next, ctx);
        }
        Action::SetFilters(patch) => {
            next.filter.apply(patch);
            clamp_stored_page(&mut next, ctx);
        }
        Action::SetPage(page) => {
            next.page = page.max(1);
            clamp_stored_page(&mut next, ctx);
        }
        Action::SetPageSize(size) => {
            next.page_size = size.max(1);
            next.page = 1;
        }
        Action::AddToCompare(request) => add_to_compare(&mut next, ctx, request),
        Action::AddFolderToCompare(folder_id) => add_folder_to_compare(&mut next, ctx, folder_id),
        Action::AddInstanceToCompare(instance_id) => add_instance_to_compare(&mut next, ctx, instance_id),
        Action::RemoveFromCompare(key) => {
            next.compare.remove(&key);
        }
        Action::ClearCompare => next.compare.clear(),
        Action::DismissNotice => {}
    }

    if let Some(notice) = &next.notice {
        tracing::warn!(action = name, "{}", notice);
    }
    tracing::debug!(
        action = name,
        selection = ?next.selection,
        page = next.page,
        queued = next.compare.len(),
        "Applied action"
    );
    next
}

/// Fold `actions` over `initial`.
pub fn replay(
    initial: &SessionState,
    actions: impl IntoIterator<Item = Action>,
    ctx: &ActionContext<'_>,
) -> SessionState {
    actions
        .into_iter()
        .fold(initial.clone(), |state, action| reduce(&state, action, ctx))
}

/// The active snapshot of the selected instance.
fn selected_snapshot<'s>(state: &SessionState, store: &'s Store) -> Option<ActiveSnapshot<'s>> {
    store.resolve(state.selection.instance_id()?, state.selection.version())
}

fn select_category(state: &mut SessionState, ctx: &ActionContext<'_>, id: String) {
    if ctx.store.category(&id).is_none() {
        state.notice = Some(Notice::CategoryNotFound { category_id: id });
        return;
    }

    if state.selection.instance_id().is_some() {
        state.active_condition = None;
    }
    state.selection = Selection::CategorySelected { category_id: id };
    state.page = 1;
}

fn select_instance(state: &mut SessionState, ctx: &ActionContext<'_>, id: String) {
    let remembered = state.remembered_version(&id).map(str::to_string);
    let Some(active) = ctx.store.resolve(&id, remembered.as_deref()) else {
        state.notice = Some(Notice::InstanceNotFound { instance_id: id });
        return;
    };

    let version = active.version().to_string();
    if let Some(requested) = remembered.filter(|_| active.fell_back) {
        state.notice = Some(Notice::VersionNotFound {
            instance_id: id.clone(),
            version: requested,
            fallback: version.clone(),
        });
    }

    if state.selection.instance_id() != Some(id.as_str()) {
        state.active_condition = None;
    }
    state.versions.insert(id.clone(), version.clone());
    state.selection = Selection::InstanceSelected {
        category_id: active.category.id.clone(),
        instance_id: id,
        version,
    };
    state.page = 1;
}

fn select_folder(state: &mut SessionState, ctx: &ActionContext<'_>, id: String) {
    let Some(active) = selected_snapshot(state, ctx.store) else {
        state.notice = Some(Notice::FolderNotFound { folder_id: id });
        return;
    };
    if active.folder(&id).is_none() {
        state.notice = Some(Notice::FolderNotFound { folder_id: id });
        return;
    }

    state.selection = Selection::FolderSelected {
        category_id: active.category.id.clone(),
        instance_id: active.instance.id.clone(),
        version: active.version().to_string(),
        folder_id: id,
    };
    state.page = 1;
}

fn change_version(state: &mut SessionState, ctx: &ActionContext<'_>, instance_id: String, version: String) {
    let Some(active) = ctx.store.resolve(&instance_id, Some(&version)) else {
        state.notice = Some(Notice::InstanceNotFound { instance_id });
        return;
    };

    let label = active.version().to_string();
    if active.fell_back {
        state.notice = Some(Notice::VersionNotFound {
            instance_id: instance_id.clone(),
            version,
            fallback: label.clone(),
        });
    }
    state.versions.insert(instance_id.clone(), label.clone());

    if state.selection.instance_id() != Some(instance_id.as_str()) {
        return;
    }
    match &mut state.selection {
        Selection::InstanceSelected { version, .. } | Selection::FolderSelected { version, .. } => {
            *version = label;
        }
        _ => {}
    }
    let stale = state
        .active_condition
        .as_deref()
        .is_some_and(|condition| active.snapshot.condition(condition).is_none());
    if stale {
        state.active_condition = None;
    }
    state.page = 1;
}

fn select_condition(state: &mut SessionState, ctx: &ActionContext<'_>, id: Option<String>) {
    let Some(id) = id else {
        state.active_condition = None;
        return;
    };

    let known = selected_snapshot(state, ctx.store).is_some_and(|active| active.snapshot.condition(&id).is_some());
    if known {
        state.active_condition = Some(id);
    } else {
        state.notice = Some(Notice::ConditionNotFound { condition_id: id });
    }
}

/// Pull the stored page back inside the selected folder's filtered file list.
fn clamp_stored_page(state: &mut SessionState, ctx: &ActionContext<'_>) {
    let Some(folder_id) = state.selection.folder_id() else {
        return;
    };
    let Some(folder) = selected_snapshot(state, ctx.store).and_then(|active| active.folder(folder_id)) else {
        return;
    };

    let total = folder_view(folder, &state.criteria(ctx.now)).map_or(0, |view| view.files.len());
    state.page = clamp_page(state.page, total, state.page_size);
}

// ============================================================
// Compare
// ============================================================

/// The condition a queued file is scoped to: the requested one if the file
/// references it, else the session's active condition if the file references
/// that.
fn scope_condition(file: &File, requested: Option<&str>, active: Option<&str>) -> Option<String> {
    requested
        .filter(|c| file.references_condition(c))
        .or_else(|| active.filter(|c| file.references_condition(c)))
        .map(str::to_string)
}

fn entry_for(active: &ActiveSnapshot<'_>, folder_id: &str, file: &File, condition_id: Option<String>) -> CompareEntry {
    CompareEntry::new(
        FileRef {
            instance_id: active.instance.id.clone(),
            version: active.version().to_string(),
            folder_id: folder_id.to_string(),
            file_id: file.id.clone(),
            file_name: file.name.clone(),
        },
        condition_id,
    )
}

fn add_to_compare(state: &mut SessionState, ctx: &ActionContext<'_>, request: CompareRequest) {
    let version = request
        .version
        .as_deref()
        .or_else(|| state.remembered_version(&request.instance_id));
    let Some(active) = ctx.store.resolve(&request.instance_id, version) else {
        state.notice = Some(Notice::InstanceNotFound {
            instance_id: request.instance_id,
        });
        return;
    };
    let Some(folder) = active.folder(&request.folder_id) else {
        state.notice = Some(Notice::FolderNotFound {
            folder_id: request.folder_id,
        });
        return;
    };
    let Some(file) = folder.file(&request.file_id) else {
        state.notice = Some(Notice::FileNotFound {
            file_id: request.file_id,
        });
        return;
    };

    let condition = scope_condition(
        file,
        request.condition_id.as_deref(),
        state.active_condition.as_deref(),
    );
    let entry = entry_for(&active, &folder.id, file, condition);
    let origin = CompareOrigin {
        kind: CompareEventKind::File,
        id: file.id.clone(),
        label: entry.label(),
    };
    state.compare.add(entry, &origin, ctx.now);
}

/// Queue `files` in order. While a condition scope is active, files that do
/// not reference it are skipped.
fn add_all<'f>(
    state: &mut SessionState,
    ctx: &ActionContext<'_>,
    active: &ActiveSnapshot<'_>,
    files: impl IntoIterator<Item = (&'f str, &'f File)>,
    origin: &CompareOrigin,
) {
    let scope = state.active_condition.clone();
    for (folder_id, file) in files {
        if let Some(condition) = scope.as_deref() {
            if !file.references_condition(condition) {
                continue;
            }
        }
        let entry = entry_for(active, folder_id, file, scope.clone());
        state.compare.add(entry, origin, ctx.now);
    }
}

fn add_folder_to_compare(state: &mut SessionState, ctx: &ActionContext<'_>, folder_id: String) {
    let Some(active) = selected_snapshot(state, ctx.store) else {
        state.notice = Some(Notice::FolderNotFound { folder_id });
        return;
    };
    let Some(folder) = active.folder(&folder_id) else {
        state.notice = Some(Notice::FolderNotFound { folder_id });
        return;
    };

    let files: Vec<&File> = folder_view(folder, &state.criteria(ctx.now))
        .map(|view| view.files)
        .unwrap_or_default();
    let origin = CompareOrigin {
        kind: CompareEventKind::Folder,
        id: folder.id.clone(),
        label: folder.name.clone(),
    };
    add_all(
        state,
        ctx,
        &active,
        files.into_iter().map(|f| (folder.id.as_str(), f)),
        &origin,
    );
}

fn add_instance_to_compare(state: &mut SessionState, ctx: &ActionContext<'_>, instance_id: String) {
    let version = state.remembered_version(&instance_id).map(str::to_string);
    let Some(active) = ctx.store.resolve(&instance_id, version.as_deref()) else {
        state.notice = Some(Notice::InstanceNotFound { instance_id });
        return;
    };

    let files: Vec<(&str, &File)> = filter_folders(active.folders(), &state.criteria(ctx.now))
        .into_iter()
        .flat_map(|view| {
            let folder_id = view.id;
            view.files.into_iter().map(move |f| (folder_id, f))
        })
        .collect();
    let origin = CompareOrigin {
        kind: CompareEventKind::Instance,
        id: active.instance.id.clone(),
        label: active.instance.name.clone(),
    };
    add_all(state, ctx, &active, files, &origin);
}
