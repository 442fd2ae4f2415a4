//! Card layout engine: the ordered dashboard cards and every action on them.
//!
//! Each mutating action either applies completely and records a snapshot in
//! the layout history, or is a no-op that leaves cards and history alone.

use crate::classify::ColumnKind;
use crate::history::{History, DEFAULT_HISTORY_LIMIT};
use serde::{Deserialize, Serialize};

/// Default maximum number of cards on a dashboard.
pub const DEFAULT_MAX_CARDS: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    #[default]
    Bar,
}

impl ChartKind {
    pub fn toggled(self) -> Self {
        match self {
            ChartKind::Pie => ChartKind::Bar,
            ChartKind::Bar => ChartKind::Pie,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Pie => "pie",
            ChartKind::Bar => "bar",
        }
    }
}

/// How many grid columns a card occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Span {
    Single,
    Double,
}

impl Span {
    pub fn width(self) -> u16 {
        match self {
            Span::Single => 1,
            Span::Double => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCard {
    pub id: String,
    pub dimension: String,
    pub measure: String,
    pub chart_kind: ChartKind,
    pub expanded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colspan: Option<Span>,
}

impl ViewCard {
    fn collapse(&mut self) {
        self.expanded = false;
        self.colspan = None;
    }

    fn expand(&mut self) {
        self.expanded = true;
        self.colspan = Some(Span::Double);
    }
}

/// Fields to merge into a card; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub dimension: Option<String>,
    pub measure: Option<String>,
    pub chart_kind: Option<ChartKind>,
    pub expanded: Option<bool>,
    pub colspan: Option<Span>,
}

impl CardPatch {
    fn apply(&self, card: &mut ViewCard) {
        if let Some(dimension) = &self.dimension {
            card.dimension = dimension.clone();
        }
        if let Some(measure) = &self.measure {
            card.measure = measure.clone();
        }
        if let Some(kind) = self.chart_kind {
            card.chart_kind = kind;
        }
        if let Some(expanded) = self.expanded {
            card.expanded = expanded;
        }
        if let Some(span) = self.colspan {
            card.colspan = Some(span);
        }
    }
}

/// Columns a new card may use: text/date columns group, numeric columns sum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibleColumns {
    pub dimensions: Vec<String>,
    pub measures: Vec<String>,
}

impl EligibleColumns {
    pub fn from_kinds<'a, I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, ColumnKind)>,
    {
        let mut eligible = Self::default();
        for (name, kind) in kinds {
            match kind {
                ColumnKind::Numeric => eligible.measures.push(name.to_string()),
                ColumnKind::Text | ColumnKind::Date => eligible.dimensions.push(name.to_string()),
            }
        }
        eligible
    }

    pub fn is_usable(&self) -> bool {
        !self.dimensions.is_empty() && !self.measures.is_empty()
    }
}

/// Where one card sits in the derived grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub row: u16,
    pub column: u16,
    pub span: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub columns: u16,
    pub rows: u16,
}

/// One column for a single card, two otherwise.
pub fn grid_columns(card_count: usize) -> u16 {
    if card_count <= 1 {
        1
    } else {
        2
    }
}

/// Flow cards into the grid. An expanded card spans both columns and starts
/// on a fresh row.
pub fn placements(cards: &[ViewCard]) -> Vec<Placement> {
    let columns = grid_columns(cards.len());
    let mut out = Vec::with_capacity(cards.len());
    let (mut row, mut column) = (0u16, 0u16);
    for card in cards {
        let span = if card.expanded { 2.min(columns) } else { 1 };
        if column + span > columns {
            row += 1;
            column = 0;
        }
        out.push(Placement { row, column, span });
        column += span;
        if column >= columns {
            row += 1;
            column = 0;
        }
    }
    out
}

pub fn geometry(cards: &[ViewCard]) -> GridGeometry {
    let columns = grid_columns(cards.len());
    let rows = placements(cards)
        .last()
        .map(|p| p.row + 1)
        .unwrap_or(0);
    GridGeometry { columns, rows }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    cards: Vec<ViewCard>,
    history: History<Vec<ViewCard>>,
    max_cards: usize,
    default_chart_kind: ChartKind,
    eligible: EligibleColumns,
    next_id: u64,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CARDS, DEFAULT_HISTORY_LIMIT)
    }
}

impl Dashboard {
    pub fn new(max_cards: usize, history_limit: usize) -> Self {
        Self {
            cards: Vec::new(),
            history: History::new(history_limit),
            max_cards,
            default_chart_kind: ChartKind::default(),
            eligible: EligibleColumns::default(),
            next_id: 1,
        }
    }

    pub fn with_default_chart_kind(mut self, kind: ChartKind) -> Self {
        self.default_chart_kind = kind;
        self
    }

    pub fn cards(&self) -> &[ViewCard] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&ViewCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn max_cards(&self) -> usize {
        self.max_cards
    }

    pub fn history(&self) -> &History<Vec<ViewCard>> {
        &self.history
    }

    pub fn eligible(&self) -> &EligibleColumns {
        &self.eligible
    }

    /// Columns new cards may use. Existing cards are left as they are.
    pub fn set_eligible(&mut self, eligible: EligibleColumns) {
        self.eligible = eligible;
    }

    pub fn geometry(&self) -> GridGeometry {
        geometry(&self.cards)
    }

    pub fn placements(&self) -> Vec<Placement> {
        placements(&self.cards)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == id)
    }

    fn begin(&mut self) {
        self.history.seed(&self.cards);
    }

    fn commit(&mut self) {
        self.history.record(self.cards.clone());
    }

    /// Append a card using the first dimension not already on the dashboard
    /// (or the first dimension) and the first measure. Returns the new id.
    pub fn add(&mut self) -> Option<String> {
        if self.cards.len() >= self.max_cards {
            tracing::debug!(max = self.max_cards, "add ignored: dashboard is full");
            return None;
        }
        if !self.eligible.is_usable() {
            tracing::debug!("add ignored: no eligible dimension/measure columns");
            return None;
        }
        let dimension = self
            .eligible
            .dimensions
            .iter()
            .find(|d| !self.cards.iter().any(|c| &c.dimension == *d))
            .unwrap_or(&self.eligible.dimensions[0])
            .clone();
        let measure = self.eligible.measures[0].clone();
        let id = format!("card-{}", self.next_id);
        self.next_id += 1;

        self.begin();
        self.cards.push(ViewCard {
            id: id.clone(),
            dimension,
            measure,
            chart_kind: self.default_chart_kind,
            expanded: false,
            colspan: None,
        });
        self.commit();
        Some(id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self.position(id) else {
            tracing::debug!(id, "remove ignored: unknown card");
            return false;
        };
        self.begin();
        self.cards.remove(pos);
        self.commit();
        true
    }

    /// Merge `patch` into the card. A patch that changes nothing is a no-op.
    pub fn update(&mut self, id: &str, patch: &CardPatch) -> bool {
        let Some(pos) = self.position(id) else {
            tracing::debug!(id, "update ignored: unknown card");
            return false;
        };
        let mut updated = self.cards[pos].clone();
        patch.apply(&mut updated);
        if updated == self.cards[pos] {
            return false;
        }
        self.begin();
        self.cards[pos] = updated;
        self.commit();
        true
    }

    /// Swap the positions of two cards after collapsing every card.
    pub fn reorder(&mut self, dragged_id: &str, target_id: &str) -> bool {
        if dragged_id == target_id {
            return false;
        }
        let (Some(from), Some(to)) = (self.position(dragged_id), self.position(target_id)) else {
            tracing::debug!(dragged_id, target_id, "reorder ignored: unknown card");
            return false;
        };
        self.begin();
        self.cards.iter_mut().for_each(ViewCard::collapse);
        self.cards.swap(from, to);
        self.commit();
        true
    }

    /// Border-merge: drop the target card and widen the source card.
    pub fn merge_expand(&mut self, source_id: &str, target_id: &str) -> bool {
        if source_id == target_id {
            return false;
        }
        let (Some(_), Some(target)) = (self.position(source_id), self.position(target_id)) else {
            tracing::debug!(source_id, target_id, "merge ignored: unknown card");
            return false;
        };
        self.begin();
        self.cards.remove(target);
        if let Some(source) = self.cards.iter_mut().find(|c| c.id == source_id) {
            source.expand();
        }
        self.commit();
        true
    }

    /// Widen the card that sits alone on the last row of a two-column grid.
    pub fn expand_alone(&mut self, id: &str) -> bool {
        let count = self.cards.len();
        let Some(pos) = self.position(id) else {
            return false;
        };
        let alone_on_last_row = count > 1 && count % 2 == 1 && pos == count - 1;
        if !alone_on_last_row || self.cards[pos].expanded {
            return false;
        }
        self.begin();
        self.cards[pos].expand();
        self.commit();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.cards = snapshot.clone();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.cards = snapshot.clone();
                true
            }
            None => false,
        }
    }
}
