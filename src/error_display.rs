//! User-facing messages for failed imports.
//!
//! Matches on typed errors (ImportError, PolarsError variants, io::ErrorKind)
//! instead of parsing message strings.

use crate::import::ImportError;
use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

/// One-line, actionable message for an import failure.
pub fn user_message(err: &ImportError) -> String {
    match err {
        ImportError::Empty => "The file is empty. Nothing to show.".to_string(),
        ImportError::UnsupportedExtension(ext) => format!(
            "Unsupported file type '{}'. Use .csv, .tsv, .psv or .json, or pass --format.",
            ext
        ),
        ImportError::MissingHeader => {
            "No header row found. Pass --no-header for files without column names.".to_string()
        }
        ImportError::DuplicateColumn(name) => format!(
            "Column '{}' appears more than once in the header. Column names must be unique.",
            name
        ),
        ImportError::Malformed(msg) => format!("Could not read the file: {}", msg),
        ImportError::Io(e) => user_message_from_io(e, None),
        ImportError::Polars(e) => user_message_from_polars(e),
        ImportError::Json(e) => format!(
            "Invalid JSON at line {}, column {}. Expected an array of records.",
            e.line(),
            e.column()
        ),
    }
}

/// Same as [`user_message`], prefixed with the file that failed.
pub fn load_failure(err: &ImportError, path: &Path) -> String {
    format!("Failed to load {}: {}", path.display(), user_message(err))
}

pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::Duplicate(msg) => format!(
            "Duplicate column name: {}. Column names must be unique.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(_) => "The file is empty. Nothing to show.".to_string(),
        PE::ShapeMismatch(msg) => format!("Rows have inconsistent field counts: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ComputeError(msg) => first_line(msg),
        PE::Context { error, msg } => {
            format!("{}: {}", msg, user_message_from_polars(error))
        }
        #[allow(unreachable_patterns)]
        _ => first_line(&err.to_string()),
    }
}

pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base = match err.kind() {
        ErrorKind::NotFound => "File not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data. Is the file UTF-8 text?".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::Interrupted => "Read interrupted. Try again.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return match context {
                Some(_) => format!("I/O error: {}", msg),
                None => msg,
            };
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

fn first_line(msg: &str) -> String {
    msg.lines()
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("An error occurred")
        .to_string()
}
