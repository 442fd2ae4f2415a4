//! Value sniffing for string cells: numbers, calendar dates and free text.
//!
//! Every cell in the row store is a raw string. Filtering, sorting and
//! aggregation coerce those strings through the functions here so the three
//! features agree on what counts as a number or a date. Column-level
//! classification is computed once per dataset load and cached by the
//! workspace.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Number of non-blank values inspected when deciding whether a column holds dates.
pub const DATE_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Date,
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Date => "date",
            ColumnKind::Text => "text",
        }
    }
}

/// A date shape and the chrono formats tried once the shape matches.
struct DatePattern {
    shape: Regex,
    formats: &'static [&'static str],
    has_time: bool,
}

fn date_patterns() -> &'static [DatePattern] {
    static PATTERNS: OnceLock<Vec<DatePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let pattern = |shape: &str, formats: &'static [&'static str], has_time: bool| {
            DatePattern {
                // Shapes are literals; a failure here is a programming error caught by tests.
                shape: Regex::new(shape).unwrap_or_else(|e| panic!("bad date shape {shape}: {e}")),
                formats,
                has_time,
            }
        };
        vec![
            pattern(r"^\d{4}-\d{1,2}-\d{1,2}$", &["%Y-%m-%d"], false),
            pattern(r"^\d{4}/\d{1,2}/\d{1,2}$", &["%Y/%m/%d"], false),
            pattern(r"^\d{1,2}/\d{1,2}/\d{4}$", &["%m/%d/%Y"], false),
            pattern(r"^\d{1,2}-\d{1,2}-\d{4}$", &["%m-%d-%Y"], false),
            pattern(r"^\d{1,2}\.\d{1,2}\.\d{4}$", &["%d.%m.%Y"], false),
            pattern(r"^\d{1,2} [A-Za-z]{3,9},? \d{4}$", &["%d %B %Y", "%d %B, %Y"], false),
            pattern(r"^[A-Za-z]{3,9} \d{1,2},? \d{4}$", &["%B %d, %Y", "%B %d %Y"], false),
            pattern(
                r"^\d{4}-\d{1,2}-\d{1,2}[T ]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?$",
                &[
                    "%Y-%m-%dT%H:%M:%S%.f",
                    "%Y-%m-%d %H:%M:%S%.f",
                    "%Y-%m-%dT%H:%M",
                    "%Y-%m-%d %H:%M",
                ],
                true,
            ),
        ]
    })
}

fn offset_datetime_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$")
            .unwrap_or_else(|e| panic!("bad offset datetime shape: {e}"))
    })
}

/// True when the cell holds nothing but whitespace.
pub fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

/// Strict numeric parse after removing quote and thousands-separator characters.
///
/// Returns None for blanks, partial numbers ("12abc") and non-finite values
/// ("NaN", "inf"), so dates such as "2024-01-05" never read as numbers.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != '"' && *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn numeric_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?")
            .unwrap_or_else(|e| panic!("bad numeric prefix pattern: {e}"))
    })
}

/// Lenient coercion used by aggregation.
///
/// After stripping quotes and thousands separators, the longest leading
/// number is read ("100 USD" is 100, "12abc" is 12). Cells without a leading
/// number, and non-finite results, count as zero.
pub fn coerce_number(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|c| *c != '"' && *c != ',').collect();
    numeric_prefix()
        .find(cleaned.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parse a cell as a calendar date (optionally with a time of day).
///
/// The value must match one of the known date shapes and also be a valid
/// calendar date; "2024-02-30" matches a shape but is rejected.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if offset_datetime_shape().is_match(trimmed) {
        return DateTime::parse_from_rfc3339(trimmed)
            .ok()
            .map(|dt| dt.naive_utc());
    }

    let pattern = date_patterns()
        .iter()
        .find(|p| p.shape.is_match(trimmed))?;
    pattern.formats.iter().find_map(|fmt| {
        if pattern.has_time {
            NaiveDateTime::parse_from_str(trimmed, fmt).ok()
        } else {
            NaiveDate::parse_from_str(trimmed, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
    })
}

/// Date-only view of [`parse_date`], used for date-range filter bounds.
pub fn parse_calendar_day(raw: &str) -> Option<NaiveDate> {
    parse_date(raw).map(|dt| dt.date())
}

/// True when the first [`DATE_SAMPLE_SIZE`] non-blank values all parse as dates.
/// A column with no non-blank values is not a date column.
pub fn is_date_column<'a, I>(values: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sampled = 0;
    for value in values.into_iter().filter(|v| !is_blank(v)) {
        if parse_date(value).is_none() {
            return false;
        }
        sampled += 1;
        if sampled == DATE_SAMPLE_SIZE {
            break;
        }
    }
    sampled > 0
}

/// Classify a column from its raw values.
///
/// Date detection runs first on a sample; otherwise the column is numeric when
/// every non-blank value parses as a number; anything else is text.
pub fn classify<'a, I>(values: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    if is_date_column(values.clone()) {
        return ColumnKind::Date;
    }
    let mut saw_number = false;
    for value in values.into_iter().filter(|v| !is_blank(v)) {
        if parse_number(value).is_none() {
            return ColumnKind::Text;
        }
        saw_number = true;
    }
    if saw_number {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}
