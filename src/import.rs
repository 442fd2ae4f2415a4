//! Import collaborator: turns files into a fully-materialized [`Dataset`].
//!
//! Delimited text goes through polars' CSV reader with type inference turned
//! off, so every cell arrives as the raw string the user typed. JSON fixture
//! files (flat record arrays) are decoded with serde_json. Nothing here touches
//! the row store; a failed import is reported and the caller keeps its state.

use dashdeck_cli::FileFormat;
use polars::prelude::*;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Errors surfaced to the user when a file cannot become a dataset.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file is empty")]
    Empty,
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("header row is missing")]
    MissingHeader,
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Options for reading a data file. Unset fields fall back to format defaults.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub format: Option<FileFormat>,
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }
}

/// A header plus data rows, validated so every row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Validate the header and normalize row widths.
    ///
    /// Short rows are padded with empty cells and long rows are truncated, so
    /// a missing cell is always stored as `""` and never absent.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ImportError> {
        if columns.is_empty() {
            return Err(ImportError::MissingHeader);
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(ImportError::DuplicateColumn(name.clone()));
            }
        }
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.columns, self.rows)
    }
}

/// Read a data file, picking the reader from `options.format` or the extension.
pub fn read_path(path: &Path, options: &ImportOptions) -> Result<Dataset, ImportError> {
    let format = match options.format.or_else(|| FileFormat::from_path(path)) {
        Some(format) => format,
        None => {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            return Err(ImportError::UnsupportedExtension(ext));
        }
    };
    let bytes = std::fs::read(path)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), ?format, "reading data file");
    match format {
        FileFormat::Json => {
            let text = String::from_utf8(bytes)
                .map_err(|e| ImportError::Malformed(format!("not valid UTF-8: {}", e)))?;
            records_from_json(&text)
        }
        delimited => {
            let delimiter = options
                .delimiter
                .or_else(|| delimited.default_delimiter())
                .unwrap_or(b',');
            parse_delimited(bytes, delimiter, options.has_header.unwrap_or(true))
        }
    }
}

/// Parse delimited text with every column read as a string.
pub fn parse_delimited(
    bytes: Vec<u8>,
    delimiter: u8,
    has_header: bool,
) -> Result<Dataset, ImportError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ImportError::Empty);
    }

    let df = CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_separator(delimiter))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    if df.width() == 0 {
        return Err(ImportError::MissingHeader);
    }

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut rows = vec![vec![String::new(); columns.len()]; df.height()];
    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let series = column.as_materialized_series().cast(&DataType::String)?;
        for (row_idx, value) in series.str()?.into_iter().enumerate() {
            if let Some(value) = value {
                rows[row_idx][col_idx] = value.to_string();
            }
        }
    }
    Dataset::new(columns, rows)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

/// Decode a JSON array of flat records into a dataset.
///
/// Columns are the union of record keys in first-seen order; a record that
/// lacks a key gets an empty cell for it.
pub fn records_from_json(text: &str) -> Result<Dataset, ImportError> {
    if text.trim().is_empty() {
        return Err(ImportError::Empty);
    }
    let value: Value = serde_json::from_str(text)?;
    let records = match value {
        Value::Array(items) => items,
        _ => {
            return Err(ImportError::Malformed(
                "expected a JSON array of records".to_string(),
            ))
        }
    };

    let mut columns: Vec<String> = Vec::new();
    let mut known: HashSet<String> = HashSet::new();
    let mut objects = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        let Value::Object(map) = record else {
            return Err(ImportError::Malformed(format!(
                "record {} is not a JSON object",
                idx
            )));
        };
        for key in map.keys() {
            if known.insert(key.clone()) {
                columns.push(key.clone());
            }
        }
        objects.push(map);
    }

    let rows = objects
        .iter()
        .map(|map| {
            columns
                .iter()
                .map(|col| map.get(col).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();
    Dataset::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dataset_pads_and_truncates_rows() {
        let ds = Dataset::new(
            strings(&["a", "b"]),
            vec![strings(&["1"]), strings(&["1", "2", "3"])],
        )
        .unwrap();
        assert_eq!(ds.rows()[0], strings(&["1", ""]));
        assert_eq!(ds.rows()[1], strings(&["1", "2"]));
    }

    #[test]
    fn test_dataset_rejects_duplicate_columns() {
        let err = Dataset::new(strings(&["a", "a"]), vec![]).unwrap_err();
        assert!(matches!(err, ImportError::DuplicateColumn(name) if name == "a"));
        assert!(matches!(
            Dataset::new(vec![], vec![]),
            Err(ImportError::MissingHeader)
        ));
    }

    #[test]
    fn test_parse_delimited_keeps_raw_strings() {
        let csv = "id,amount,region\n1,\"1,200.50\",EMEA\n2,007,\n";
        let ds = parse_delimited(csv.as_bytes().to_vec(), b',', true).unwrap();
        assert_eq!(ds.columns(), strings(&["id", "amount", "region"]).as_slice());
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0][1], "1,200.50");
        assert_eq!(ds.rows()[1][1], "007");
        assert_eq!(ds.rows()[1][2], "");
    }

    #[test]
    fn test_parse_delimited_empty_input() {
        assert!(matches!(
            parse_delimited(b"  \n".to_vec(), b',', true),
            Err(ImportError::Empty)
        ));
    }

    #[test]
    fn test_records_from_json() {
        let text = r#"[
            {"order": "A-1", "status": "pending", "total": 12.5},
            {"order": "A-2", "status": "approved", "note": null, "flag": true}
        ]"#;
        let ds = records_from_json(text).unwrap();
        assert_eq!(
            ds.columns(),
            strings(&["order", "status", "total", "note", "flag"]).as_slice()
        );
        assert_eq!(ds.rows()[0], strings(&["A-1", "pending", "12.5", "", ""]));
        assert_eq!(ds.rows()[1], strings(&["A-2", "approved", "", "", "true"]));
    }

    #[test]
    fn test_records_from_json_rejects_non_arrays() {
        assert!(matches!(
            records_from_json(r#"{"a": 1}"#),
            Err(ImportError::Malformed(_))
        ));
        assert!(matches!(
            records_from_json("[1, 2]"),
            Err(ImportError::Malformed(_))
        ));
        assert!(matches!(records_from_json("[{"), Err(ImportError::Json(_))));
    }

    #[test]
    fn test_read_path_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "name\tscore").unwrap();
        writeln!(file, "ada\t3").unwrap();
        drop(file);

        let ds = read_path(&path, &ImportOptions::new()).unwrap();
        assert_eq!(ds.columns(), strings(&["name", "score"]).as_slice());
        assert_eq!(ds.rows()[0], strings(&["ada", "3"]));
    }

    #[test]
    fn test_read_path_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        std::fs::write(&path, b"whatever").unwrap();
        assert!(matches!(
            read_path(&path, &ImportOptions::new()),
            Err(ImportError::UnsupportedExtension(ext)) if ext == "xlsx"
        ));
    }
}
