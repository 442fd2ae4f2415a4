//! The loaded dataset together with its filter, sort and page state.
//!
//! The derived view (store indices after filtering, then sorting) is memoized
//! and keyed on the store generation plus a revision counter bumped by every
//! filter or sort change, so repeated renders do not refilter.

use crate::aggregate::{aggregate, AggregatedSeries};
use crate::cards::EligibleColumns;
use crate::classify::{classify, ColumnKind};
use crate::filter::{ColumnFilter, ColumnFilterEngine, FilterKind};
use crate::import::Dataset;
use crate::pagination::{paginate, total_pages, PageCursor};
use crate::sort::{SortDirection, SortEngine, SortState};
use crate::store::{CellEdit, RowStore};
use std::collections::HashMap;

/// Cache key for everything derived from the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ViewKey {
    store: u64,
    revision: u64,
}

#[derive(Debug, Default)]
struct ViewCache {
    key: Option<ViewKey>,
    rows: Vec<usize>,
    aggregates: HashMap<(String, String), AggregatedSeries>,
}

#[derive(Debug)]
pub struct Workspace {
    store: RowStore,
    kinds: HashMap<String, ColumnKind>,
    filters: ColumnFilterEngine,
    sort: SortEngine,
    cursor: PageCursor,
    edit: Option<CellEdit>,
    revision: u64,
    cache: ViewCache,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PAGE_SIZE, SortEngine::new())
    }
}

impl Workspace {
    pub fn new(page_size: usize, sort: SortEngine) -> Self {
        Self {
            store: RowStore::new(),
            kinds: HashMap::new(),
            filters: ColumnFilterEngine::new(),
            sort,
            cursor: PageCursor::new(page_size),
            edit: None,
            revision: 0,
            cache: ViewCache::default(),
        }
    }

    /// Replace the dataset. Filters, sort, page and any pending edit are reset
    /// since they refer to the previous columns and values.
    pub fn load(&mut self, dataset: Dataset) {
        self.store.load(dataset);
        self.kinds = self
            .store
            .columns()
            .names()
            .iter()
            .map(|name| {
                let values = self.store.get_column(name).unwrap_or_default();
                (name.clone(), classify(values.iter().copied()))
            })
            .collect();
        self.filters = ColumnFilterEngine::for_store(&self.store);
        self.sort.clear();
        self.cursor.reset();
        self.edit = None;
        self.invalidate();
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    pub fn columns(&self) -> &[String] {
        self.store.columns().names()
    }

    pub fn column_kind(&self, column: &str) -> Option<ColumnKind> {
        self.kinds.get(column).copied()
    }

    /// Dimension and measure candidates for new dashboard cards.
    pub fn eligible_columns(&self) -> EligibleColumns {
        EligibleColumns::from_kinds(self.columns().iter().filter_map(|name| {
            self.column_kind(name).map(|kind| (name.as_str(), kind))
        }))
    }

    pub fn filters(&self) -> &ColumnFilterEngine {
        &self.filters
    }

    pub fn filter(&self, column: &str) -> Option<&ColumnFilter> {
        self.filters.get(column)
    }

    pub fn filter_kind(&self, column: &str) -> Option<FilterKind> {
        self.filters.kind(column)
    }

    pub fn sort_state(&self) -> Option<&SortState> {
        self.sort.state()
    }

    pub fn page(&self) -> usize {
        self.cursor.page()
    }

    pub fn page_size(&self) -> usize {
        self.cursor.page_size()
    }

    /// Generation of the derived view; changes whenever it may have changed.
    pub fn view_generation(&self) -> u64 {
        self.store.generation() + self.revision
    }

    fn invalidate(&mut self) {
        self.revision += 1;
        self.cache.key = None;
    }

    /// Applied after a predicate or ordering change.
    fn changed(&mut self, changed: bool) -> bool {
        if changed {
            self.invalidate();
            self.cursor.reset();
        }
        changed
    }

    /// Every filter mutation returns to page 1, even one that keeps the
    /// predicate as it was.
    fn filtered(&mut self, changed: bool) -> bool {
        if changed {
            self.invalidate();
        }
        self.cursor.reset();
        changed
    }

    fn refresh(&mut self) {
        let key = ViewKey {
            store: self.store.generation(),
            revision: self.revision,
        };
        if self.cache.key == Some(key) {
            return;
        }
        let mut rows = self.filters.apply(&self.store);
        self.sort.apply(&self.store, &mut rows);
        tracing::debug!(rows = rows.len(), "derived view rebuilt");
        self.cache.rows = rows;
        self.cache.aggregates.clear();
        self.cache.key = Some(key);
    }

    /// Store indices of the filtered, sorted view.
    pub fn view_rows(&mut self) -> &[usize] {
        self.refresh();
        &self.cache.rows
    }

    pub fn row_count(&mut self) -> usize {
        self.view_rows().len()
    }

    pub fn total_pages(&mut self) -> usize {
        let count = self.row_count();
        total_pages(count, self.cursor.page_size())
    }

    /// Store indices on the current page.
    pub fn page_rows(&mut self) -> Vec<usize> {
        self.refresh();
        paginate(&self.cache.rows, self.cursor.page_size(), self.cursor.page()).to_vec()
    }

    pub fn set_page(&mut self, page: usize) -> usize {
        let count = self.row_count();
        self.cursor.go_to(page, count)
    }

    pub fn next_page(&mut self) -> bool {
        let count = self.row_count();
        self.cursor.next(count)
    }

    pub fn prev_page(&mut self) -> bool {
        let count = self.row_count();
        self.cursor.prev(count)
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.cursor.set_page_size(page_size);
    }

    pub fn toggle_sort(&mut self, column: &str) {
        if !self.store.columns().contains(column) {
            return;
        }
        self.sort.toggle(column);
        self.changed(true);
    }

    pub fn sort_by(&mut self, column: &str, direction: SortDirection) {
        if !self.store.columns().contains(column) {
            return;
        }
        self.sort.sort(column, direction);
        self.changed(true);
    }

    pub fn clear_sort(&mut self) -> bool {
        let had_sort = self.sort.state().is_some();
        self.sort.clear();
        self.changed(had_sort)
    }

    pub fn set_selected<I, S>(&mut self, column: &str, values: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let changed = self.filters.set_selected(column, values);
        self.filtered(changed)
    }

    pub fn toggle_filter_value(&mut self, column: &str, value: &str) -> bool {
        let changed = self.filters.toggle_value(column, value);
        self.filtered(changed)
    }

    pub fn toggle_select_all(&mut self, column: &str) -> bool {
        let changed = self.filters.toggle_select_all(column);
        self.filtered(changed)
    }

    pub fn toggle_blanks(&mut self, column: &str) -> bool {
        let changed = self.filters.toggle_blanks(column);
        self.filtered(changed)
    }

    pub fn set_date_range(&mut self, column: &str, from: Option<&str>, to: Option<&str>) -> bool {
        let changed = self.filters.set_date_range(column, from, to);
        self.filtered(changed)
    }

    /// Search terms only narrow candidate lists; the view rows stay cached.
    pub fn set_search_term(&mut self, column: &str, term: &str) {
        self.filters.set_search_term(column, term);
        self.filtered(false);
    }

    pub fn set_filter_open(&mut self, column: &str, open: bool) {
        self.filters.set_open(column, open);
        self.filtered(false);
    }

    pub fn clear_filter(&mut self, column: &str) -> bool {
        let changed = self.filters.clear(column);
        self.filtered(changed)
    }

    pub fn clear_filters(&mut self) -> bool {
        let changed = self.filters.clear_all();
        self.filtered(changed)
    }

    pub fn unique_values(&self, column: &str) -> &[String] {
        self.filters.unique_values(column)
    }

    pub fn candidate_values(&self, column: &str) -> Vec<&str> {
        self.filters.candidate_values(column)
    }

    /// Grouped sums over the current filtered, sorted view. Cached until the
    /// view changes.
    pub fn aggregate(&mut self, dimension: &str, measure: &str) -> &AggregatedSeries {
        self.refresh();
        let ViewCache {
            rows, aggregates, ..
        } = &mut self.cache;
        let store = &self.store;
        aggregates
            .entry((dimension.to_string(), measure.to_string()))
            .or_insert_with(|| aggregate(store, rows.as_slice(), dimension, measure))
    }

    pub fn editing(&self) -> Option<&CellEdit> {
        self.edit.as_ref()
    }

    /// Start editing the cell at `view_row` (an index into the current page).
    pub fn begin_edit(&mut self, view_row: usize, column: &str) -> bool {
        let Some(&row) = self.page_rows().get(view_row) else {
            return false;
        };
        let Some(original) = self.store.value(row, column) else {
            return false;
        };
        self.edit = Some(CellEdit {
            row,
            column: column.to_string(),
            value: original.to_string(),
            original: original.to_string(),
        });
        true
    }

    pub fn edit_input(&mut self, ch: char) {
        if let Some(edit) = self.edit.as_mut() {
            edit.value.push(ch);
        }
    }

    pub fn edit_backspace(&mut self) {
        if let Some(edit) = self.edit.as_mut() {
            edit.value.pop();
        }
    }

    pub fn cancel_edit(&mut self) -> bool {
        self.edit.take().is_some()
    }

    /// Write the pending edit into the store. Returns whether a cell changed.
    pub fn commit_edit(&mut self) -> bool {
        let Some(edit) = self.edit.take() else {
            return false;
        };
        if !edit.is_dirty() {
            return false;
        }
        if !self.store.set_cell(edit.row, &edit.column, edit.value.clone()) {
            tracing::warn!(row = edit.row, column = %edit.column, "edit target vanished");
            return false;
        }
        self.filters.refresh_column(&self.store, &edit.column);
        if let Some(values) = self.store.get_column(&edit.column) {
            let kind = classify(values.iter().copied());
            self.kinds.insert(edit.column.clone(), kind);
        }
        tracing::debug!(row = edit.row, column = %edit.column, "cell edited");
        self.invalidate();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        let dataset = Dataset::new(
            vec!["region".into(), "amount".into(), "when".into()],
            vec![
                vec!["EMEA".into(), "10".into(), "2024-01-01".into()],
                vec!["APAC".into(), "30".into(), "2024-02-01".into()],
                vec!["EMEA".into(), "5".into(), "2024-03-01".into()],
                vec!["".into(), "2".into(), "2024-04-01".into()],
                vec!["NA".into(), "7".into(), "2024-05-01".into()],
            ],
        )
        .unwrap();
        let mut ws = Workspace::new(2, SortEngine::new());
        ws.load(dataset);
        ws
    }

    #[test]
    fn test_load_classifies_columns() {
        let ws = workspace();
        assert_eq!(ws.column_kind("region"), Some(ColumnKind::Text));
        assert_eq!(ws.column_kind("amount"), Some(ColumnKind::Numeric));
        assert_eq!(ws.column_kind("when"), Some(ColumnKind::Date));
        let eligible = ws.eligible_columns();
        assert_eq!(eligible.dimensions, vec!["region", "when"]);
        assert_eq!(eligible.measures, vec!["amount"]);
    }

    #[test]
    fn test_filter_then_sort_then_page() {
        let mut ws = workspace();
        ws.set_page(3);
        assert_eq!(ws.page(), 3);
        ws.set_selected("region", ["EMEA", "NA"]);
        assert_eq!(ws.page(), 1);
        ws.sort_by("amount", SortDirection::Desc);
        assert_eq!(ws.view_rows(), &[0, 4, 2]);
        assert_eq!(ws.page_rows(), vec![0, 4]);
        assert!(ws.next_page());
        assert_eq!(ws.page_rows(), vec![2]);
        assert!(!ws.next_page());
        assert_eq!(ws.total_pages(), 2);
    }

    #[test]
    fn test_search_term_resets_page() {
        let mut ws = workspace();
        ws.set_page(2);
        let generation = ws.view_generation();
        ws.set_search_term("region", "em");
        assert_eq!(ws.page(), 1);
        assert_eq!(ws.view_generation(), generation);
        assert_eq!(ws.candidate_values("region"), vec!["EMEA"]);

        ws.set_page(3);
        ws.set_filter_open("region", true);
        assert_eq!(ws.page(), 1);
    }

    #[test]
    fn test_noop_filter_resets_page() {
        let mut ws = workspace();
        ws.set_page(2);
        let generation = ws.view_generation();
        assert!(!ws.clear_filters());
        assert_eq!(ws.page(), 1);
        assert_eq!(ws.view_generation(), generation);
    }

    #[test]
    fn test_aggregate_follows_view() {
        let mut ws = workspace();
        let total: f64 = ws.aggregate("region", "amount").iter().map(|e| e.value).sum();
        assert_eq!(total, 54.0);
        ws.set_selected("region", ["EMEA"]);
        let series = ws.aggregate("region", "amount").clone();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 15.0);
        assert_eq!(series[0].percentage, "100.0");
    }

    #[test]
    fn test_view_is_memoized_until_change() {
        let mut ws = workspace();
        let generation = ws.view_generation();
        ws.view_rows();
        ws.view_rows();
        assert_eq!(ws.view_generation(), generation);
        ws.toggle_sort("amount");
        assert_ne!(ws.view_generation(), generation);
    }

    #[test]
    fn test_commit_edit_updates_store_and_domain() {
        let mut ws = workspace();
        assert!(ws.begin_edit(1, "region"));
        ws.edit_backspace();
        ws.edit_backspace();
        ws.edit_backspace();
        ws.edit_backspace();
        for ch in "LATAM".chars() {
            ws.edit_input(ch);
        }
        assert!(ws.commit_edit());
        assert_eq!(ws.store().value(1, "region"), Some("LATAM"));
        assert!(ws.unique_values("region").contains(&"LATAM".to_string()));
        assert!(!ws.unique_values("region").contains(&"APAC".to_string()));
        assert!(ws.editing().is_none());
    }

    #[test]
    fn test_commit_edit_maps_view_row_to_store_row() {
        let mut ws = workspace();
        ws.sort_by("amount", SortDirection::Desc);
        // Page 1 of the sorted view is rows [1 (30), 0 (10)].
        assert!(ws.begin_edit(0, "amount"));
        assert_eq!(ws.editing().unwrap().row, 1);
        ws.edit_input('0');
        assert!(ws.commit_edit());
        assert_eq!(ws.store().value(1, "amount"), Some("300"));
    }

    #[test]
    fn test_cancel_and_unchanged_edits() {
        let mut ws = workspace();
        ws.begin_edit(0, "region");
        ws.edit_input('!');
        assert!(ws.cancel_edit());
        assert_eq!(ws.store().value(0, "region"), Some("EMEA"));

        ws.begin_edit(0, "region");
        assert!(!ws.commit_edit());
        assert!(!ws.begin_edit(9, "region"));
        assert!(!ws.begin_edit(0, "missing"));
    }

    #[test]
    fn test_load_resets_state() {
        let mut ws = workspace();
        ws.set_selected("region", ["EMEA"]);
        ws.toggle_sort("amount");
        let next = Dataset::new(vec!["x".into()], vec![vec!["1".into()]]).unwrap();
        ws.load(next);
        assert!(ws.sort_state().is_none());
        assert!(ws.filters().active_columns().is_empty());
        assert_eq!(ws.row_count(), 1);
    }
}
