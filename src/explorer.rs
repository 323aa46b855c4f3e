//! The explorer facade: one store, one session, and the derived views over
//! them.
//!
//! Queries take `&self` and never change the session. Actions go through
//! [`Explorer::dispatch`] and return the complete new [`SessionState`].

use crate::align::{build_series, AlignMode, AlignedSeries, YNormMode};
use crate::clock::{Clock, SystemClock};
use crate::compare::CompareQueue;
use crate::filter::{filter_folders, folder_view, instance_view, paginate, FilterPatch, FolderView, InstanceView, Page};
use crate::kpi::{build_table, KpiTable};
use crate::memo::Memo;
use crate::models::{Category, File};
use crate::navigation::{reduce, Action, ActionContext, CompareRequest, SessionState, Selection};
use crate::store::{ActiveSnapshot, Store};

/// Snapshot identity plus requested conditions and baseline.
type KpiKey = (String, String, Vec<String>, Option<String>);
type SeriesKey = (String, String, Vec<String>, Option<String>, AlignMode, YNormMode);

pub struct Explorer {
    store: Store,
    state: SessionState,
    clock: Box<dyn Clock>,
    kpi_cache: Memo<KpiKey, KpiTable>,
    series_cache: Memo<SeriesKey, AlignedSeries>,
}

impl Explorer {
    pub fn new(store: Store) -> Self {
        Self::with_state(store, SessionState::default(), Box::new(SystemClock))
    }

    pub fn with_clock(store: Store, clock: impl Clock + 'static) -> Self {
        Self::with_state(store, SessionState::default(), Box::new(clock))
    }

    pub fn with_state(store: Store, state: SessionState, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            state,
            clock,
            kpi_cache: Memo::default(),
            series_cache: Memo::default(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn get_tree(&self) -> &[Category] {
        self.store.categories()
    }

    pub fn get_selection(&self) -> &Selection {
        &self.state.selection
    }

    pub fn get_compare_queue(&self) -> &CompareQueue {
        &self.state.compare
    }

    /// Snapshot backing the selected instance.
    pub fn active_snapshot(&self) -> Option<ActiveSnapshot<'_>> {
        self.store
            .resolve(self.state.selection.instance_id()?, self.state.selection.version())
    }

    /// Snapshot of any instance at its remembered (or current) version.
    fn snapshot_of(&self, instance_id: &str) -> Option<ActiveSnapshot<'_>> {
        self.store
            .resolve(instance_id, self.state.remembered_version(instance_id))
    }

    /// Instances of `category_id` that pass the current filter, in order.
    /// `None` when the category does not exist.
    pub fn get_filtered_instances(&self, category_id: &str) -> Option<Vec<InstanceView<'_>>> {
        let category = self.store.category(category_id)?;
        let criteria = self.state.criteria(self.clock.now());
        Some(
            category
                .instances
                .iter()
                .filter_map(|instance| self.snapshot_of(&instance.id))
                .filter_map(|active| instance_view(&active, &criteria))
                .collect(),
        )
    }

    /// Folders of `instance_id`'s active snapshot that pass the current
    /// filter. `None` when the instance does not exist.
    pub fn get_filtered_folders(&self, instance_id: &str) -> Option<Vec<FolderView<'_>>> {
        let active = self.snapshot_of(instance_id)?;
        let criteria = self.state.criteria(self.clock.now());
        Some(filter_folders(active.folders(), &criteria))
    }

    /// One page of the filtered files of `folder_id` in the selected
    /// instance's active snapshot. An out-of-range page is clamped.
    ///
    /// `None` when no instance is selected or the folder is not part of the
    /// snapshot. A folder that is filtered out yields an empty page.
    pub fn get_filtered_files(&self, folder_id: &str, page: usize, page_size: usize) -> Option<Page<&File>> {
        let folder = self.active_snapshot()?.folder(folder_id)?;
        let criteria = self.state.criteria(self.clock.now());
        let files = folder_view(folder, &criteria)
            .map(|view| view.files)
            .unwrap_or_default();
        Some(paginate(files, page, page_size))
    }

    /// The page the session is on, for the selected folder.
    pub fn current_page(&self) -> Option<Page<&File>> {
        let folder_id = self.state.selection.folder_id()?;
        self.get_filtered_files(folder_id, self.state.page, self.state.page_size)
    }

    /// KPI table for the selected instance's active snapshot.
    pub fn get_kpi_table(&self, condition_ids: &[&str], baseline_id: Option<&str>) -> Option<KpiTable> {
        let active = self.active_snapshot()?;
        let key = (
            active.instance.id.clone(),
            active.version().to_string(),
            owned(condition_ids),
            baseline_id.map(str::to_string),
        );
        Some(
            self.kpi_cache
                .get_or_compute(key, || build_table(&active, condition_ids, baseline_id)),
        )
    }

    /// Aligned curve series for the selected instance's active snapshot.
    pub fn get_aligned_series(
        &self,
        condition_ids: &[&str],
        baseline_id: Option<&str>,
        align_mode: AlignMode,
        y_mode: YNormMode,
    ) -> Option<AlignedSeries> {
        let active = self.active_snapshot()?;
        let key = (
            active.instance.id.clone(),
            active.version().to_string(),
            owned(condition_ids),
            baseline_id.map(str::to_string),
            align_mode,
            y_mode,
        );
        Some(self.series_cache.get_or_compute(key, || {
            build_series(&active, condition_ids, baseline_id, align_mode, y_mode)
        }))
    }

    // ============================================================
    // Actions
    // ============================================================

    pub fn dispatch(&mut self, action: Action) -> &SessionState {
        let ctx = ActionContext {
            store: &self.store,
            now: self.clock.now(),
        };
        self.state = reduce(&self.state, action, &ctx);
        &self.state
    }

    pub fn select_category(&mut self, id: &str) -> &SessionState {
        self.dispatch(Action::SelectCategory(id.to_string()))
    }

    pub fn select_instance(&mut self, id: &str) -> &SessionState {
        self.dispatch(Action::SelectInstance(id.to_string()))
    }

    pub fn select_folder(&mut self, id: &str) -> &SessionState {
        self.dispatch(Action::SelectFolder(id.to_string()))
    }

    pub fn change_version(&mut self, instance_id: &str, version: &str) -> &SessionState {
        self.dispatch(Action::ChangeVersion {
            instance_id: instance_id.to_string(),
            version: version.to_string(),
        })
    }

    pub fn select_condition(&mut self, id: Option<&str>) -> &SessionState {
        self.dispatch(Action::SelectCondition(id.map(str::to_string)))
    }

    pub fn set_search_keyword(&mut self, keyword: &str) -> &SessionState {
        self.dispatch(Action::SetSearchKeyword(keyword.to_string()))
    }

    pub fn set_filters(&mut self, patch: FilterPatch) -> &SessionState {
        self.dispatch(Action::SetFilters(patch))
    }

    pub fn set_page(&mut self, page: usize) -> &SessionState {
        self.dispatch(Action::SetPage(page))
    }

    pub fn set_page_size(&mut self, page_size: usize) -> &SessionState {
        self.dispatch(Action::SetPageSize(page_size))
    }

    pub fn add_to_compare(&mut self, request: CompareRequest) -> &SessionState {
        self.dispatch(Action::AddToCompare(request))
    }

    pub fn add_folder_to_compare(&mut self, folder_id: &str) -> &SessionState {
        self.dispatch(Action::AddFolderToCompare(folder_id.to_string()))
    }

    pub fn add_instance_to_compare(&mut self, instance_id: &str) -> &SessionState {
        self.dispatch(Action::AddInstanceToCompare(instance_id.to_string()))
    }

    pub fn remove_from_compare(&mut self, compare_key: &str) -> &SessionState {
        self.dispatch(Action::RemoveFromCompare(compare_key.to_string()))
    }

    pub fn clear_compare(&mut self) -> &SessionState {
        self.dispatch(Action::ClearCompare)
    }

    pub fn dismiss_notice(&mut self) -> &SessionState {
        self.dispatch(Action::DismissNotice)
    }
}

fn owned(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}
