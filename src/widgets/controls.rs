use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

const TABLE_CONTROLS: [(&str, &str); 7] = [
    ("s", "Sort"),
    ("v", "Filter"),
    ("b", "Blanks"),
    ("c", "Clear"),
    ("Enter", "Edit"),
    ("Tab", "Cards"),
    ("q", "Quit"),
];

const CARD_CONTROLS: [(&str, &str); 8] = [
    ("a", "Add"),
    ("x", "Remove"),
    ("t", "Chart"),
    ("d/m", "Columns"),
    ("e", "Merge"),
    ("u/r", "Undo/Redo"),
    ("Tab", "Table"),
    ("q", "Quit"),
];

const EDIT_CONTROLS: [(&str, &str); 2] = [("Enter", "Commit"), ("Esc", "Cancel")];

/// Which set of key hints to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControlsMode {
    #[default]
    Table,
    Cards,
    Editing,
}

#[derive(Default)]
pub struct Controls {
    pub mode: ControlsMode,
    pub row_count: Option<usize>,
    /// (current page, total pages)
    pub page: Option<(usize, usize)>,
    pub dimmed: bool,
    pub bg: Option<Color>,
    pub key_color: Option<Color>,
}

impl Controls {
    pub fn new(mode: ControlsMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_row_count(mut self, row_count: usize) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn with_page(mut self, page: usize, total: usize) -> Self {
        self.page = Some((page, total));
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_colors(mut self, bg: Color, key_color: Color) -> Self {
        self.bg = Some(bg);
        self.key_color = Some(key_color);
        self
    }

    fn hints(&self) -> &'static [(&'static str, &'static str)] {
        match self.mode {
            ControlsMode::Table => &TABLE_CONTROLS,
            ControlsMode::Cards => &CARD_CONTROLS,
            ControlsMode::Editing => &EDIT_CONTROLS,
        }
    }

    fn status_text(&self) -> Option<String> {
        match (self.row_count, self.page) {
            (Some(rows), Some((page, total))) => {
                Some(format!("Rows: {}  Page {}/{}", rows, page, total))
            }
            (Some(rows), None) => Some(format!("Rows: {}", rows)),
            (None, Some((page, total))) => Some(format!("Page {}/{}", page, total)),
            (None, None) => None,
        }
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let hints = self.hints();
        let status = self.status_text();

        let mut constraints = hints.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });
        if let Some(text) = &status {
            constraints.push(Constraint::Length(text.chars().count() as u16 + 2));
        }
        constraints.push(Constraint::Fill(1));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);
        let bg = self.bg.unwrap_or(Color::DarkGray);
        let base_style = if self.dimmed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        let key_style = match self.key_color {
            Some(c) if !self.dimmed => base_style.fg(c).bold(),
            _ => base_style.bold(),
        };

        for (i, (key, action)) in hints.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(key_style)
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(base_style.bg(bg))
                .render(layout[j + 1], buf);
        }

        let mut fill_idx = hints.len() * 2;
        if let Some(text) = status {
            Paragraph::new(text)
                .style(base_style.bg(bg).fg(if self.dimmed {
                    Color::DarkGray
                } else {
                    Color::White
                }))
                .right_aligned()
                .render(layout[fill_idx], buf);
            fill_idx += 1;
        }

        Paragraph::new("")
            .style(base_style.bg(bg))
            .render(layout[fill_idx], buf);
    }
}
