//! Group-by-one-column sums turned into ranked, percentage-annotated series.

use crate::classify::{coerce_number, is_blank};
use crate::store::RowStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label used for rows whose dimension cell is blank.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    pub label: String,
    pub value: f64,
    /// Share of the grouping total with one decimal, e.g. "42.5".
    pub percentage: String,
    pub formatted_value: String,
}

pub type AggregatedSeries = Vec<SeriesEntry>;

/// Sum `measure` grouped by the raw `dimension` string over the given rows.
///
/// Blank dimensions group under [`UNKNOWN_LABEL`]; measures contribute their
/// leading number, or zero when they have none. Output is ranked by value, descending, with ties kept in
/// first-seen order. Unknown column names yield an empty series.
pub fn aggregate(
    store: &RowStore,
    rows: &[usize],
    dimension: &str,
    measure: &str,
) -> AggregatedSeries {
    let columns = store.columns();
    let (Some(dim_pos), Some(measure_pos)) = (columns.position(dimension), columns.position(measure))
    else {
        return Vec::new();
    };

    let mut groups: Vec<(String, f64)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    for row in rows.iter().filter_map(|&idx| store.row(idx)) {
        let raw = row.cell(dim_pos);
        let label = if is_blank(raw) { UNKNOWN_LABEL } else { raw };
        let value = coerce_number(row.cell(measure_pos));
        match slots.get(label) {
            Some(&slot) => groups[slot].1 += value,
            None => {
                slots.insert(label.to_string(), groups.len());
                groups.push((label.to_string(), value));
            }
        }
    }

    groups.sort_by(|a, b| b.1.total_cmp(&a.1));
    let total: f64 = groups.iter().map(|(_, v)| v).sum();
    groups
        .into_iter()
        .map(|(label, value)| SeriesEntry {
            percentage: format_percentage(value, total),
            formatted_value: format_value(value),
            label,
            value,
        })
        .collect()
}

fn format_percentage(value: f64, total: f64) -> String {
    if total > 0.0 {
        format!("{:.1}", value / total * 100.0)
    } else {
        "0.0".to_string()
    }
}

/// Thousands-separated value with at most two decimals ("12,345.5").
pub fn format_value(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let frac = frac_part.trim_end_matches('0');
    let sign = if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

/// How category labels under a chart should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOrientation {
    Horizontal,
    /// Rotated by this many degrees (negative is counter-clockwise).
    Rotated(i16),
}

/// Thresholds for [`label_orientation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelHints {
    /// Minimum estimated width per label for straight labels.
    pub min_label_width: u16,
    /// Maximum number of straight labels.
    pub max_horizontal_labels: usize,
    pub rotated_angle: i16,
}

impl Default for LabelHints {
    fn default() -> Self {
        Self {
            min_label_width: 80,
            max_horizontal_labels: 8,
            rotated_angle: -45,
        }
    }
}

/// Straight labels only when each label gets at least `min_label_width`
/// and there are no more than `max_horizontal_labels` items.
pub fn label_orientation(
    available_width: u32,
    item_count: usize,
    hints: &LabelHints,
) -> LabelOrientation {
    if item_count == 0 {
        return LabelOrientation::Horizontal;
    }
    let per_label = available_width as f64 / item_count as f64;
    if per_label >= hints.min_label_width as f64 && item_count <= hints.max_horizontal_labels {
        LabelOrientation::Horizontal
    } else {
        LabelOrientation::Rotated(hints.rotated_angle)
    }
}
