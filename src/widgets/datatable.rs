use crate::sort::SortDirection;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, StatefulWidget, Table, TableState, Widget},
};

/// Marker appended to headers of filtered columns.
pub const FILTER_MARKER: &str = "*";

/// Header text with the sort indicator and filter marker.
pub fn header_label(name: &str, sort: Option<SortDirection>, filtered: bool) -> String {
    let mut label = name.to_string();
    if let Some(direction) = sort {
        label.push(' ');
        label.push_str(direction.indicator());
    }
    if filtered {
        label.push_str(FILTER_MARKER);
    }
    label
}

/// Selection inside the rendered page.
#[derive(Debug, Default, Clone)]
pub struct DataTableState {
    pub table_state: TableState,
    pub selected_column: usize,
    /// First column drawn; moved so the selected column stays visible.
    pub column_offset: usize,
    /// Rows that fit in the last rendered area.
    pub visible_rows: usize,
}

impl DataTableState {
    pub fn selected_row(&self) -> usize {
        self.table_state.selected().unwrap_or(0)
    }

    pub fn select_row(&mut self, row: usize) {
        self.table_state.select(Some(row));
    }

    pub fn reset(&mut self) {
        self.table_state.select(Some(0));
        self.selected_column = 0;
        self.column_offset = 0;
    }
}

/// One page of rows, already converted to display strings.
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based number of the first row when row numbers are shown.
    pub row_number_start: Option<usize>,
    /// (page row, text) of the cell being edited.
    pub editing: Option<(usize, String)>,
    pub header_fg: Color,
    pub header_bg: Color,
    pub selected_fg: Color,
    pub table_cell_padding: u16,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows,
            row_number_start: None,
            editing: None,
            header_fg: Color::White,
            header_bg: Color::Indexed(236),
            selected_fg: Color::Cyan,
            table_cell_padding: 1,
        }
    }

    pub fn with_row_numbers(mut self, start: usize) -> Self {
        self.row_number_start = Some(start);
        self
    }

    pub fn with_editing(mut self, row: usize, text: String) -> Self {
        self.editing = Some((row, text));
        self
    }

    pub fn with_colors(mut self, header_fg: Color, header_bg: Color, selected_fg: Color) -> Self {
        self.header_fg = header_fg;
        self.header_bg = header_bg;
        self.selected_fg = selected_fg;
        self
    }

    fn column_widths(&self, selected_column: usize) -> Vec<u16> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let mut width = header.chars().count();
                for (row_idx, row) in self.rows.iter().enumerate() {
                    let len = match &self.editing {
                        Some((edit_row, text)) if *edit_row == row_idx && col == selected_column => {
                            text.chars().count() + 1
                        }
                        _ => row.get(col).map(|c| c.chars().count()).unwrap_or(0),
                    };
                    width = width.max(len);
                }
                width.min(u16::MAX as usize) as u16
            })
            .collect()
    }
}

/// First column to draw so that `selected` is visible within `width`.
pub fn column_offset(widths: &[u16], width: u16, padding: u16, selected: usize, current: usize) -> usize {
    let selected = selected.min(widths.len().saturating_sub(1));
    let mut offset = current.min(selected);
    loop {
        let used: u32 = widths[offset..=selected]
            .iter()
            .map(|w| *w as u32 + padding as u32)
            .sum();
        if used <= width as u32 + padding as u32 || offset == selected {
            return offset;
        }
        offset += 1;
    }
}

impl StatefulWidget for DataTable {
    type State = DataTableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        state.visible_rows = area.height.saturating_sub(1) as usize;
        if self.headers.is_empty() {
            Paragraph::new("No columns").centered().render(area, buf);
            return;
        }

        state.selected_column = state.selected_column.min(self.headers.len() - 1);
        if !self.rows.is_empty() && state.selected_row() >= self.rows.len() {
            state.select_row(self.rows.len() - 1);
        }
        if state.table_state.selected().is_none() {
            state.select_row(0);
        }

        let widths = self.column_widths(state.selected_column);
        state.column_offset = column_offset(
            &widths,
            area.width,
            self.table_cell_padding,
            state.selected_column,
            state.column_offset,
        );

        let row_num_width = self
            .row_number_start
            .map(|start| (start + self.rows.len()).to_string().len() as u16);

        let mut used = row_num_width.map(|w| w + self.table_cell_padding).unwrap_or(0);
        let mut visible: Vec<usize> = Vec::new();
        for (col, width) in widths.iter().enumerate().skip(state.column_offset) {
            if used + width > area.width && !visible.is_empty() {
                break;
            }
            visible.push(col);
            used += width + self.table_cell_padding;
        }

        let header_style = Style::default().fg(self.header_fg).bg(self.header_bg);
        let selected_header_style = header_style
            .fg(self.selected_fg)
            .add_modifier(Modifier::BOLD);

        let mut header_cells: Vec<Cell> = Vec::new();
        if row_num_width.is_some() {
            header_cells.push(Cell::from(""));
        }
        header_cells.extend(visible.iter().map(|&col| {
            let style = if col == state.selected_column {
                selected_header_style
            } else {
                header_style
            };
            Cell::from(Span::styled(self.headers[col].clone(), style))
        }));

        let selected_row = state.selected_row();
        let rows: Vec<Row> = self
            .rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let mut cells: Vec<Cell> = Vec::new();
                if let Some(start) = self.row_number_start {
                    cells.push(
                        Cell::from((start + row_idx).to_string())
                            .style(Style::default().fg(Color::DarkGray)),
                    );
                }
                cells.extend(visible.iter().map(|&col| {
                    let is_cursor = row_idx == selected_row && col == state.selected_column;
                    match &self.editing {
                        Some((edit_row, text)) if is_cursor && *edit_row == row_idx => Cell::from(
                            Line::from(vec![
                                Span::raw(text.clone()),
                                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
                            ]),
                        )
                        .style(Style::default().fg(self.selected_fg).add_modifier(Modifier::UNDERLINED)),
                        _ => {
                            let value = row.get(col).cloned().unwrap_or_default();
                            let cell = Cell::from(value);
                            if is_cursor {
                                cell.style(Style::default().add_modifier(Modifier::BOLD))
                            } else {
                                cell
                            }
                        }
                    }
                }));
                Row::new(cells)
            })
            .collect();

        let mut constraints: Vec<Constraint> = Vec::new();
        if let Some(w) = row_num_width {
            constraints.push(Constraint::Length(w));
        }
        constraints.extend(visible.iter().map(|&col| Constraint::Length(widths[col])));

        StatefulWidget::render(
            Table::new(rows, constraints)
                .column_spacing(self.table_cell_padding)
                .header(Row::new(header_cells).style(header_style))
                .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            area,
            buf,
            &mut state.table_state,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_label() {
        assert_eq!(header_label("amount", None, false), "amount");
        assert_eq!(header_label("amount", Some(SortDirection::Asc), false), "amount ▲");
        assert_eq!(header_label("amount", Some(SortDirection::Desc), true), "amount ▼*");
    }

    #[test]
    fn test_column_offset_scrolls_to_selection() {
        let widths = [10, 10, 10, 10];
        assert_eq!(column_offset(&widths, 25, 1, 0, 0), 0);
        assert_eq!(column_offset(&widths, 25, 1, 1, 0), 0);
        assert_eq!(column_offset(&widths, 25, 1, 3, 0), 2);
        // Moving left pulls the offset back.
        assert_eq!(column_offset(&widths, 25, 1, 1, 2), 1);
    }

    #[test]
    fn test_renders_headers_and_rows() {
        let area = Rect::new(0, 0, 40, 4);
        let mut buf = Buffer::empty(area);
        let mut state = DataTableState::default();
        DataTable::new(
            vec!["region".into(), "amount ▲".into()],
            vec![
                vec!["EMEA".into(), "10".into()],
                vec!["APAC".into(), "30".into()],
            ],
        )
        .render(area, &mut buf, &mut state);
        let header: String = (0..area.width).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(header.contains("region"));
        assert!(header.contains("amount ▲"));
        let first: String = (0..area.width).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(first.contains("EMEA"));
        assert_eq!(state.visible_rows, 3);
    }
}
