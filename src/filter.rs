//! Per-column filters: discrete value selections or date ranges.

use crate::classify::{is_blank, is_date_column, parse_calendar_day};
use crate::store::{Row, RowStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How a column is filtered. Decided once per load from a sample of its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Discrete,
    DateRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub selected_values: BTreeSet<String>,
    /// Narrows the candidate list shown to the user; never affects matching.
    pub search_term: String,
    pub is_open: bool,
    pub include_blanks: bool,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl ColumnFilter {
    /// True when this filter can reject rows.
    pub fn is_active(&self, kind: FilterKind) -> bool {
        match kind {
            FilterKind::Discrete => !self.selected_values.is_empty() || self.include_blanks,
            FilterKind::DateRange => self.date_from.is_some() || self.date_to.is_some(),
        }
    }

    pub fn matches(&self, kind: FilterKind, raw: &str) -> bool {
        match kind {
            FilterKind::Discrete => {
                if !self.is_active(kind) {
                    return true;
                }
                if is_blank(raw) {
                    self.include_blanks
                } else {
                    self.selected_values.contains(raw)
                }
            }
            FilterKind::DateRange => {
                // Unparseable bounds are treated as unset.
                let from = self.date_from.as_deref().and_then(parse_calendar_day);
                let to = self.date_to.as_deref().and_then(parse_calendar_day);
                if from.is_none() && to.is_none() {
                    return true;
                }
                if is_blank(raw) {
                    return false;
                }
                let Some(day) = parse_calendar_day(raw) else {
                    return false;
                };
                from.map_or(true, |f| f <= day) && to.map_or(true, |t| day <= t)
            }
        }
    }
}

fn normalize_bound(bound: Option<&str>) -> Option<String> {
    bound
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Default)]
pub struct ColumnFilterEngine {
    filters: BTreeMap<String, ColumnFilter>,
    kinds: HashMap<String, FilterKind>,
    domains: HashMap<String, Vec<String>>,
}

impl ColumnFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh engine for a newly loaded dataset. Old selections are
    /// dropped because selectable values are dataset-specific.
    pub fn for_store(store: &RowStore) -> Self {
        let mut engine = Self::new();
        for name in store.columns().names() {
            engine.refresh_column(store, name);
        }
        engine
    }

    /// Recompute the kind and value domain of one column (after a cell edit).
    pub fn refresh_column(&mut self, store: &RowStore, column: &str) {
        let Some(values) = store.get_column(column) else {
            return;
        };
        let kind = if is_date_column(values.iter().copied()) {
            FilterKind::DateRange
        } else {
            FilterKind::Discrete
        };
        let domain: BTreeSet<&str> = values.iter().copied().filter(|v| !is_blank(v)).collect();
        if let Some(previous) = self.kinds.insert(column.to_string(), kind) {
            if previous != kind && self.filters.remove(column).is_some() {
                tracing::debug!(column, "filter dropped after column kind changed");
            }
        }
        self.domains.insert(
            column.to_string(),
            domain.into_iter().map(str::to_string).collect(),
        );
    }

    pub fn kind(&self, column: &str) -> Option<FilterKind> {
        self.kinds.get(column).copied()
    }

    pub fn get(&self, column: &str) -> Option<&ColumnFilter> {
        self.filters.get(column)
    }

    pub fn is_active(&self, column: &str) -> bool {
        match (self.filters.get(column), self.kind(column)) {
            (Some(filter), Some(kind)) => filter.is_active(kind),
            _ => false,
        }
    }

    /// Columns with a filter that can reject rows, in name order.
    pub fn active_columns(&self) -> Vec<&str> {
        self.filters
            .keys()
            .filter(|c| self.is_active(c))
            .map(String::as_str)
            .collect()
    }

    /// Sorted distinct non-blank values of the unfiltered column.
    pub fn unique_values(&self, column: &str) -> &[String] {
        self.domains.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The value domain narrowed by the column's search term (case-insensitive).
    pub fn candidate_values(&self, column: &str) -> Vec<&str> {
        let term = self
            .filters
            .get(column)
            .map(|f| f.search_term.to_lowercase())
            .unwrap_or_default();
        self.unique_values(column)
            .iter()
            .filter(|v| term.is_empty() || v.to_lowercase().contains(&term))
            .map(String::as_str)
            .collect()
    }

    fn edit(
        &mut self,
        column: &str,
        kind: FilterKind,
        f: impl FnOnce(&mut ColumnFilter, &[String]),
    ) -> bool {
        if self.kind(column) != Some(kind) {
            return false;
        }
        let domain = self.domains.get(column).cloned().unwrap_or_default();
        let entry = self.filters.entry(column.to_string()).or_default();
        let before = entry.clone();
        f(entry, &domain);
        let changed = *entry != before;
        if *entry == ColumnFilter::default() {
            self.filters.remove(column);
        }
        changed
    }

    pub fn set_selected<I, S>(&mut self, column: &str, values: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        self.edit(column, FilterKind::Discrete, |f, _| f.selected_values = values)
    }

    pub fn toggle_value(&mut self, column: &str, value: &str) -> bool {
        self.edit(column, FilterKind::Discrete, |f, _| {
            if !f.selected_values.remove(value) {
                f.selected_values.insert(value.to_string());
            }
        })
    }

    /// Select every value of the column's domain, or clear the selection when
    /// every value is already selected.
    pub fn toggle_select_all(&mut self, column: &str) -> bool {
        self.edit(column, FilterKind::Discrete, |f, domain| {
            let all_selected = domain.iter().all(|v| f.selected_values.contains(v));
            if all_selected {
                f.selected_values.clear();
            } else {
                f.selected_values = domain.iter().cloned().collect();
            }
        })
    }

    pub fn toggle_blanks(&mut self, column: &str) -> bool {
        self.edit(column, FilterKind::Discrete, |f, _| {
            f.include_blanks = !f.include_blanks
        })
    }

    pub fn set_date_range(&mut self, column: &str, from: Option<&str>, to: Option<&str>) -> bool {
        let from = normalize_bound(from);
        let to = normalize_bound(to);
        self.edit(column, FilterKind::DateRange, |f, _| {
            f.date_from = from;
            f.date_to = to;
        })
    }

    /// Update the candidate-list search term. Does not change which rows match.
    pub fn set_search_term(&mut self, column: &str, term: &str) {
        if let Some(kind) = self.kind(column) {
            self.edit(column, kind, |f, _| f.search_term = term.to_string());
        }
    }

    pub fn set_open(&mut self, column: &str, open: bool) {
        if let Some(kind) = self.kind(column) {
            self.edit(column, kind, |f, _| f.is_open = open);
        }
    }

    /// Drop the predicate state of one column. Returns whether matching changed.
    pub fn clear(&mut self, column: &str) -> bool {
        let was_active = self.is_active(column);
        self.filters.remove(column);
        was_active
    }

    pub fn clear_all(&mut self) -> bool {
        let was_active = !self.active_columns().is_empty();
        self.filters.clear();
        was_active
    }

    /// Logical AND of every active column filter.
    pub fn matches_row(&self, store: &RowStore, row: &Row) -> bool {
        self.filters.iter().all(|(column, filter)| {
            let (Some(kind), Some(position)) = (self.kind(column), store.columns().position(column))
            else {
                return true;
            };
            filter.matches(kind, row.cell(position))
        })
    }

    /// Store indices of matching rows, in store order.
    pub fn apply(&self, store: &RowStore) -> Vec<usize> {
        store
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| self.matches_row(store, row))
            .map(|(idx, _)| idx)
            .collect()
    }
}
