//! Single-column, type-aware stable sorting of the filtered row view.

use crate::classify::{is_blank, parse_date, parse_number};
use crate::store::RowStore;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn indicator(&self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: String,
    pub direction: SortDirection,
}

/// What re-invoking sort on the active column does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCycle {
    /// asc -> desc -> asc
    #[default]
    Toggle,
    /// asc -> desc -> unsorted
    TriState,
}

/// Total order for enumerated status values, matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRanks {
    ranks: HashMap<String, usize>,
}

impl StatusRanks {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranks = HashMap::new();
        for (idx, status) in order.into_iter().enumerate() {
            ranks
                .entry(status.as_ref().trim().to_lowercase())
                .or_insert(idx);
        }
        Self { ranks }
    }

    pub fn rank(&self, raw: &str) -> Option<usize> {
        self.ranks.get(&raw.trim().to_lowercase()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// A cell parsed once per sort so the comparator never re-sniffs strings.
///
/// Variant order is the tier order used when two cells have different types:
/// blanks, ranked statuses, numbers, dates, then free text.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Blank,
    Ranked(usize),
    Number(f64),
    Date(NaiveDateTime),
    Text { folded: String, raw: String },
}

impl SortKey {
    fn from_cell(raw: &str, ranks: Option<&StatusRanks>) -> Self {
        if is_blank(raw) {
            return SortKey::Blank;
        }
        if let Some(rank) = ranks.and_then(|r| r.rank(raw)) {
            return SortKey::Ranked(rank);
        }
        if let Some(n) = parse_number(raw) {
            return SortKey::Number(n);
        }
        if let Some(d) = parse_date(raw) {
            return SortKey::Date(d);
        }
        SortKey::Text {
            folded: raw.to_lowercase(),
            raw: raw.to_string(),
        }
    }

    fn tier(&self) -> u8 {
        match self {
            SortKey::Blank => 0,
            SortKey::Ranked(_) => 1,
            SortKey::Number(_) => 2,
            SortKey::Date(_) => 3,
            SortKey::Text { .. } => 4,
        }
    }
}

fn compare_keys(a: &SortKey, b: &SortKey) -> Ordering {
    match (a, b) {
        (SortKey::Ranked(x), SortKey::Ranked(y)) => x.cmp(y),
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Date(x), SortKey::Date(y)) => x.cmp(y),
        (
            SortKey::Text { folded: fa, raw: ra },
            SortKey::Text { folded: fb, raw: rb },
        ) => {
            // Lowercase first when only case differs.
            fa.cmp(fb).then_with(|| rb.cmp(ra))
        }
        _ => a.tier().cmp(&b.tier()),
    }
}

/// Compare two raw cells the way the sort engine does, ascending.
pub fn compare_cells(a: &str, b: &str, ranks: Option<&StatusRanks>) -> Ordering {
    compare_keys(&SortKey::from_cell(a, ranks), &SortKey::from_cell(b, ranks))
}

#[derive(Debug, Clone, Default)]
pub struct SortEngine {
    state: Option<SortState>,
    cycle: SortCycle,
    ranks: Option<StatusRanks>,
}

impl SortEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cycle(mut self, cycle: SortCycle) -> Self {
        self.cycle = cycle;
        self
    }

    /// Rank these status values ahead of numeric/date/text comparison.
    pub fn with_status_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ranks = StatusRanks::new(order);
        self.ranks = (!ranks.is_empty()).then_some(ranks);
        self
    }

    pub fn state(&self) -> Option<&SortState> {
        self.state.as_ref()
    }

    pub fn cycle(&self) -> SortCycle {
        self.cycle
    }

    pub fn sort(&mut self, column: &str, direction: SortDirection) {
        self.state = Some(SortState {
            column: column.to_string(),
            direction,
        });
    }

    /// Header-click semantics: a new column sorts ascending; the active
    /// column flips to descending, then back to ascending (Toggle) or to
    /// unsorted (TriState).
    pub fn toggle(&mut self, column: &str) {
        let next = match &self.state {
            Some(s) if s.column == column => match (s.direction, self.cycle) {
                (SortDirection::Asc, _) => Some(SortDirection::Desc),
                (SortDirection::Desc, SortCycle::Toggle) => Some(SortDirection::Asc),
                (SortDirection::Desc, SortCycle::TriState) => None,
            },
            _ => Some(SortDirection::Asc),
        };
        self.state = next.map(|direction| SortState {
            column: column.to_string(),
            direction,
        });
    }

    pub fn clear(&mut self) {
        self.state = None;
    }

    /// Stable sort of store indices by the active column. Rows with equal
    /// keys keep their relative order in both directions.
    pub fn apply(&self, store: &RowStore, indices: &mut [usize]) {
        let Some(state) = &self.state else {
            return;
        };
        let Some(position) = store.columns().position(&state.column) else {
            return;
        };
        let ranks = self.ranks.as_ref();
        let mut keyed: Vec<(SortKey, usize)> = indices
            .iter()
            .map(|&idx| {
                let raw = store.row(idx).map(|r| r.cell(position)).unwrap_or("");
                (SortKey::from_cell(raw, ranks), idx)
            })
            .collect();
        keyed.sort_by(|(a, _), (b, _)| {
            let ord = compare_keys(a, b);
            match state.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        for (slot, (_, idx)) in indices.iter_mut().zip(keyed) {
            *slot = idx;
        }
    }
}
