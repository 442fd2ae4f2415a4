//! Dashboard cards laid out on the derived grid.

use crate::aggregate::{label_orientation, AggregatedSeries, LabelHints, LabelOrientation};
use crate::cards::{geometry, placements, ChartKind, Placement, ViewCard};
use ratatui::{
    buffer::Buffer,
    layout::{Direction, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Widget},
};

/// Approximate pixel width of one terminal cell, used for label-fit hints.
pub const CELL_WIDTH_PX: u32 = 8;

/// Blocks used by the percentage bars of pie cards.
const SHARE_WIDTH: usize = 20;

pub struct CardGrid<'a> {
    cards: &'a [ViewCard],
    series: &'a [AggregatedSeries],
    selected: Option<usize>,
    hints: LabelHints,
    border: Color,
    border_selected: Color,
    bar: Color,
    value: Color,
}

impl<'a> CardGrid<'a> {
    /// `series[i]` is the aggregation for `cards[i]`.
    pub fn new(cards: &'a [ViewCard], series: &'a [AggregatedSeries]) -> Self {
        Self {
            cards,
            series,
            selected: None,
            hints: LabelHints::default(),
            border: Color::DarkGray,
            border_selected: Color::Cyan,
            bar: Color::Cyan,
            value: Color::White,
        }
    }

    pub fn with_selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_hints(mut self, hints: LabelHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_colors(mut self, border: Color, border_selected: Color, bar: Color, value: Color) -> Self {
        self.border = border;
        self.border_selected = border_selected;
        self.bar = bar;
        self.value = value;
        self
    }
}

/// Screen rectangle for a card placement.
pub fn placement_rect(area: Rect, placement: &Placement, columns: u16, rows: u16) -> Rect {
    let columns = columns.max(1);
    let rows = rows.max(1);
    let col_width = area.width / columns;
    let row_height = area.height / rows;
    let x = area.x + placement.column * col_width;
    let y = area.y + placement.row * row_height;
    // The last column and row absorb the rounding remainder.
    let width = if placement.column + placement.span >= columns {
        area.x + area.width - x
    } else {
        col_width * placement.span
    };
    let height = if placement.row + 1 >= rows {
        area.y + area.height - y
    } else {
        row_height
    };
    Rect::new(x, y, width, height)
}

fn abbreviate(label: &str, width: usize) -> String {
    if label.chars().count() <= width {
        return label.to_string();
    }
    if width <= 1 {
        return label.chars().take(width).collect();
    }
    let mut out: String = label.chars().take(width - 1).collect();
    out.push('…');
    out
}

impl CardGrid<'_> {
    fn render_bar(&self, series: &AggregatedSeries, area: Rect, buf: &mut Buffer) {
        let available = area.width as u32 * CELL_WIDTH_PX;
        let orientation = label_orientation(available, series.len(), &self.hints);
        let value_of = |v: f64| if v.is_finite() && v > 0.0 { v.round() as u64 } else { 0 };

        match orientation {
            LabelOrientation::Horizontal => {
                let count = series.len().max(1) as u16;
                let bar_width = (area.width.saturating_sub(count - 1) / count).max(1);
                let bars: Vec<Bar> = series
                    .iter()
                    .map(|entry| {
                        Bar::default()
                            .value(value_of(entry.value))
                            .text_value(entry.formatted_value.clone())
                            .label(Line::from(abbreviate(&entry.label, bar_width as usize)))
                    })
                    .collect();
                BarChart::default()
                    .data(BarGroup::default().bars(&bars))
                    .bar_width(bar_width)
                    .bar_gap(1)
                    .bar_style(Style::default().fg(self.bar))
                    .value_style(Style::default().fg(Color::Black).bg(self.bar))
                    .render(area, buf);
            }
            LabelOrientation::Rotated(_) => {
                // Labels do not fit under the bars: lay the bars sideways so
                // each label gets its own line.
                let label_width = (area.width / 3).max(4) as usize;
                let bars: Vec<Bar> = series
                    .iter()
                    .map(|entry| {
                        Bar::default()
                            .value(value_of(entry.value))
                            .text_value(entry.formatted_value.clone())
                            .label(Line::from(abbreviate(&entry.label, label_width)))
                    })
                    .collect();
                BarChart::default()
                    .direction(Direction::Horizontal)
                    .data(BarGroup::default().bars(&bars))
                    .bar_width(1)
                    .bar_gap(0)
                    .bar_style(Style::default().fg(self.bar))
                    .value_style(Style::default().fg(self.value))
                    .render(area, buf);
            }
        }
    }

    fn render_pie(&self, series: &AggregatedSeries, area: Rect, buf: &mut Buffer) {
        let label_width = series
            .iter()
            .map(|e| e.label.chars().count())
            .max()
            .unwrap_or(0)
            .min((area.width / 3) as usize);
        let lines: Vec<Line> = series
            .iter()
            .map(|entry| {
                let share = entry.percentage.parse::<f64>().unwrap_or(0.0);
                let filled = ((share / 100.0) * SHARE_WIDTH as f64).round() as usize;
                Line::from(vec![
                    Span::raw(format!(
                        "{:<width$} ",
                        abbreviate(&entry.label, label_width),
                        width = label_width
                    )),
                    Span::styled(
                        "█".repeat(filled.min(SHARE_WIDTH)),
                        Style::default().fg(self.bar),
                    ),
                    Span::styled(
                        "░".repeat(SHARE_WIDTH - filled.min(SHARE_WIDTH)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        format!(" {:>5}%  {}", entry.percentage, entry.formatted_value),
                        Style::default().fg(self.value),
                    ),
                ])
            })
            .collect();
        Paragraph::new(lines).render(area, buf);
    }
}

impl Widget for CardGrid<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.cards.is_empty() {
            Paragraph::new("No cards yet. Press 'a' to add one.")
                .centered()
                .style(Style::default().fg(Color::DarkGray))
                .render(area, buf);
            return;
        }

        let grid = geometry(self.cards);
        for (idx, (card, placement)) in self.cards.iter().zip(placements(self.cards)).enumerate() {
            let rect = placement_rect(area, &placement, grid.columns, grid.rows);
            let selected = self.selected == Some(idx);
            let border_style = if selected {
                Style::default()
                    .fg(self.border_selected)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.border)
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!(
                    " {} by {} ({}) ",
                    card.measure,
                    card.dimension,
                    card.chart_kind.as_str()
                ));
            let inner = block.inner(rect);
            block.render(rect, buf);

            match self.series.get(idx) {
                Some(series) if !series.is_empty() => match card.chart_kind {
                    ChartKind::Bar => self.render_bar(series, inner, buf),
                    ChartKind::Pie => self.render_pie(series, inner, buf),
                },
                _ => Paragraph::new("No data")
                    .centered()
                    .style(Style::default().fg(Color::DarkGray))
                    .render(inner, buf),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SeriesEntry;

    fn card(id: &str, chart_kind: ChartKind) -> ViewCard {
        ViewCard {
            id: id.to_string(),
            dimension: "region".to_string(),
            measure: "amount".to_string(),
            chart_kind,
            expanded: false,
            colspan: None,
        }
    }

    fn series() -> AggregatedSeries {
        vec![
            SeriesEntry {
                label: "EMEA".into(),
                value: 30.0,
                percentage: "75.0".into(),
                formatted_value: "30".into(),
            },
            SeriesEntry {
                label: "APAC".into(),
                value: 10.0,
                percentage: "25.0".into(),
                formatted_value: "10".into(),
            },
        ]
    }

    fn text(buf: &Buffer) -> String {
        let area = buf.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_placement_rect_spans_columns() {
        let area = Rect::new(0, 0, 81, 20);
        let single = Placement { row: 0, column: 1, span: 1 };
        assert_eq!(placement_rect(area, &single, 2, 2), Rect::new(40, 0, 41, 10));
        let double = Placement { row: 1, column: 0, span: 2 };
        assert_eq!(placement_rect(area, &double, 2, 2), Rect::new(0, 10, 81, 10));
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("EMEA", 10), "EMEA");
        assert_eq!(abbreviate("Marketing", 4), "Mar…");
    }

    #[test]
    fn test_renders_pie_percentages() {
        let area = Rect::new(0, 0, 80, 10);
        let mut buf = Buffer::empty(area);
        let cards = [card("card-1", ChartKind::Pie)];
        let data = [series()];
        CardGrid::new(&cards, &data).render(area, &mut buf);
        let out = text(&buf);
        assert!(out.contains("amount by region (pie)"));
        assert!(out.contains("75.0%"));
        assert!(out.contains("APAC"));
    }

    #[test]
    fn test_empty_dashboard_hint() {
        let area = Rect::new(0, 0, 60, 3);
        let mut buf = Buffer::empty(area);
        CardGrid::new(&[], &[]).render(area, &mut buf);
        assert!(text(&buf).contains("Press 'a'"));
    }
}
