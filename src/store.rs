//! Row store: the imported dataset as ordered rows of raw string cells.

use crate::import::Dataset;
use std::collections::HashMap;

/// Ordered, distinct column names fixed at import time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnSet {
    pub fn new(names: Vec<String>) -> Self {
        let positions = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self { names, positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One record; cells are aligned with the store's [`ColumnSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<String>,
}

impl Row {
    pub fn cell(&self, position: usize) -> &str {
        self.cells.get(position).map(String::as_str).unwrap_or("")
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

#[derive(Debug, Clone, Default)]
pub struct RowStore {
    columns: ColumnSet,
    rows: Vec<Row>,
    generation: u64,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut store = Self::new();
        store.load(dataset);
        store
    }

    /// Replace the whole dataset in one step.
    pub fn load(&mut self, dataset: Dataset) {
        let (columns, rows) = dataset.into_parts();
        self.columns = ColumnSet::new(columns);
        self.rows = rows.into_iter().map(|cells| Row { cells }).collect();
        self.generation += 1;
        tracing::info!(
            rows = self.rows.len(),
            columns = self.columns.len(),
            "dataset loaded"
        );
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bumped on every load and cell edit.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let position = self.columns.position(column)?;
        self.rows.get(row).map(|r| r.cell(position))
    }

    /// Raw values of one column in row order, or None for an unknown column.
    pub fn get_column(&self, name: &str) -> Option<Vec<&str>> {
        let position = self.columns.position(name)?;
        Some(self.rows.iter().map(|r| r.cell(position)).collect())
    }

    /// Overwrite a single cell. Returns false (and changes nothing) when the
    /// row or column does not exist.
    pub fn set_cell(&mut self, row: usize, column: &str, value: impl Into<String>) -> bool {
        let Some(position) = self.columns.position(column) else {
            return false;
        };
        let Some(target) = self.rows.get_mut(row) else {
            return false;
        };
        target.cells[position] = value.into();
        self.generation += 1;
        true
    }
}

/// An in-progress cell edit. Lives outside the store until committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEdit {
    /// Index into the store, not into the filtered view.
    pub row: usize,
    pub column: String,
    pub value: String,
    pub original: String,
}

impl CellEdit {
    pub fn is_dirty(&self) -> bool {
        self.value != self.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowStore {
        let dataset = Dataset::new(
            vec!["region".into(), "amount".into()],
            vec![
                vec!["EMEA".into(), "10".into()],
                vec!["".into(), "5".into()],
            ],
        )
        .unwrap();
        RowStore::from_dataset(dataset)
    }

    #[test]
    fn test_get_column_and_value() {
        let store = sample();
        assert_eq!(store.get_column("region"), Some(vec!["EMEA", ""]));
        assert_eq!(store.get_column("missing"), None);
        assert_eq!(store.value(0, "amount"), Some("10"));
        assert_eq!(store.value(9, "amount"), None);
    }

    #[test]
    fn test_set_cell_touches_one_field() {
        let mut store = sample();
        let before = store.generation();
        assert!(store.set_cell(1, "region", "APAC"));
        assert_eq!(store.value(1, "region"), Some("APAC"));
        assert_eq!(store.value(1, "amount"), Some("5"));
        assert_eq!(store.value(0, "region"), Some("EMEA"));
        assert!(store.generation() > before);
    }

    #[test]
    fn test_set_cell_rejects_unknown_targets() {
        let mut store = sample();
        let before = store.generation();
        assert!(!store.set_cell(5, "region", "x"));
        assert!(!store.set_cell(0, "nope", "x"));
        assert_eq!(store.generation(), before);
    }

    #[test]
    fn test_load_replaces_everything() {
        let mut store = sample();
        let next = Dataset::new(vec!["only".into()], vec![vec!["1".into()]]).unwrap();
        store.load(next);
        assert_eq!(store.columns().names(), &["only".to_string()]);
        assert_eq!(store.len(), 1);
        assert!(!store.columns().contains("region"));
    }
}
