use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Paragraph, StatefulWidget};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

pub mod aggregate;
pub mod cards;
pub mod classify;
pub mod config;
pub mod error_display;
pub mod filter;
pub mod history;
pub mod import;
pub mod pagination;
pub mod sort;
pub mod store;
pub mod widgets;
pub mod workspace;

pub use cards::{ChartKind, Dashboard, ViewCard};
pub use config::{
    rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, Theme,
};
pub use dashdeck_cli::{Args, FileFormat};
pub use import::{Dataset, ImportError, ImportOptions};
pub use workspace::Workspace;

use aggregate::{AggregatedSeries, LabelHints};
use cards::CardPatch;
use filter::FilterKind;
use sort::{SortCycle, SortEngine};
use widgets::card_grid::CardGrid;
use widgets::controls::{Controls, ControlsMode};
use widgets::datatable::{header_label, DataTable, DataTableState};

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "dashdeck";

#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    Open(PathBuf, ImportOptions),
    Loaded(Dataset),
    ImportFailed(String),
    Resize(u16, u16), // resized (width, height)
    Exit,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum View {
    #[default]
    Table,
    Cards,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
}

/// One interactive session: a workspace plus the dashboard built from it.
pub struct App {
    path: Option<PathBuf>,
    pending_path: Option<PathBuf>,
    workspace: Workspace,
    dashboard: Dashboard,
    view: View,
    input_mode: InputMode,
    table_state: DataTableState,
    selected_card: usize,
    status: Option<StatusMessage>,
    theme: Theme,
    hints: LabelHints,
    row_numbers: bool,
    debug: bool,
    num_events: u64,
}

impl App {
    pub fn new(config: &AppConfig, theme: Theme) -> App {
        let cycle = if config.sort.tri_state {
            SortCycle::TriState
        } else {
            SortCycle::Toggle
        };
        let sort = SortEngine::new()
            .with_cycle(cycle)
            .with_status_order(&config.sort.status_order);
        let dashboard = Dashboard::new(config.layout.max_cards, config.history.limit)
            .with_default_chart_kind(config.layout.default_chart_kind);

        App {
            path: None,
            pending_path: None,
            workspace: Workspace::new(config.display.page_size, sort),
            dashboard,
            view: View::Table,
            input_mode: InputMode::Normal,
            table_state: DataTableState::default(),
            selected_card: 0,
            status: None,
            theme,
            hints: config.label_hints(),
            row_numbers: config.display.row_numbers,
            debug: config.debug.enabled,
            num_events: 0,
        }
    }

    pub fn enable_debug(&mut self) {
        self.debug = true;
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn selected_card(&self) -> usize {
        self.selected_card
    }

    pub fn selected_column(&self) -> usize {
        self.table_state.selected_column
    }

    pub fn selected_row(&self) -> usize {
        self.table_state.selected_row()
    }

    fn color(&self, name: &str) -> Color {
        self.theme.get(name)
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level: StatusLevel::Info,
        });
    }

    fn warn(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level: StatusLevel::Warning,
        });
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Open(path, options) => {
                self.pending_path = Some(path.clone());
                match import::read_path(path, options) {
                    Ok(dataset) => Some(AppEvent::Loaded(dataset)),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "import failed");
                        Some(AppEvent::ImportFailed(error_display::load_failure(&e, path)))
                    }
                }
            }
            AppEvent::Loaded(dataset) => {
                self.load(dataset.clone());
                None
            }
            AppEvent::ImportFailed(msg) => {
                // The previous dataset and everything derived from it stay as they were.
                self.pending_path = None;
                self.status = Some(StatusMessage {
                    text: msg.clone(),
                    level: StatusLevel::Error,
                });
                None
            }
            AppEvent::Resize(_, _) => None,
            AppEvent::Exit => None,
        }
    }

    fn load(&mut self, dataset: Dataset) {
        let rows = dataset.len();
        self.workspace.load(dataset);
        self.dashboard.set_eligible(self.workspace.eligible_columns());
        self.table_state.reset();
        self.input_mode = InputMode::Normal;
        self.path = self.pending_path.take().or(self.path.take());
        self.info(format!("Loaded {} rows", rows));
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        if self.input_mode == InputMode::Editing {
            self.edit_key(event);
            return None;
        }
        match event.code {
            KeyCode::Char('q') => return Some(AppEvent::Exit),
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(AppEvent::Exit)
            }
            KeyCode::Tab => {
                self.view = match self.view {
                    View::Table => View::Cards,
                    View::Cards => View::Table,
                };
                self.status = None;
                return None;
            }
            _ => {}
        }
        match self.view {
            View::Table => self.table_key(event),
            View::Cards => self.cards_key(event),
        }
        None
    }

    fn edit_key(&mut self, event: &KeyEvent) {
        match event.code {
            KeyCode::Enter => {
                if self.workspace.commit_edit() {
                    self.dashboard.set_eligible(self.workspace.eligible_columns());
                    self.info("Cell updated");
                }
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Esc => {
                self.workspace.cancel_edit();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Backspace => self.workspace.edit_backspace(),
            KeyCode::Char(ch) => self.workspace.edit_input(ch),
            _ => {}
        }
    }

    fn selected_column_name(&self) -> Option<String> {
        self.workspace
            .columns()
            .get(self.table_state.selected_column)
            .cloned()
    }

    /// Column name and raw value of the cell under the cursor.
    fn selected_cell(&mut self) -> Option<(String, String)> {
        let column = self.selected_column_name()?;
        let row = *self.workspace.page_rows().get(self.table_state.selected_row())?;
        let value = self.workspace.store().value(row, &column)?.to_string();
        Some((column, value))
    }

    /// The view changed shape (filter or sort), so the cursor goes back to the top.
    fn view_reset(&mut self, changed: bool) {
        if changed {
            self.table_state.select_row(0);
        }
    }

    fn table_key(&mut self, event: &KeyEvent) {
        let column_count = self.workspace.columns().len();
        match event.code {
            KeyCode::Left | KeyCode::Char('h') => {
                self.table_state.selected_column = self.table_state.selected_column.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.table_state.selected_column + 1 < column_count {
                    self.table_state.selected_column += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let row = self.table_state.selected_row();
                if row > 0 {
                    self.table_state.select_row(row - 1);
                } else if self.workspace.prev_page() {
                    let last = self.workspace.page_rows().len().saturating_sub(1);
                    self.table_state.select_row(last);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let row = self.table_state.selected_row();
                let on_page = self.workspace.page_rows().len();
                if row + 1 < on_page {
                    self.table_state.select_row(row + 1);
                } else if self.workspace.next_page() {
                    self.table_state.select_row(0);
                }
            }
            KeyCode::PageDown => {
                if self.workspace.next_page() {
                    self.table_state.select_row(0);
                }
            }
            KeyCode::PageUp => {
                if self.workspace.prev_page() {
                    self.table_state.select_row(0);
                }
            }
            KeyCode::Home => {
                self.workspace.set_page(1);
                self.table_state.select_row(0);
            }
            KeyCode::End => {
                let last = self.workspace.total_pages();
                self.workspace.set_page(last);
                self.table_state.select_row(0);
            }
            KeyCode::Char('s') => {
                if let Some(column) = self.selected_column_name() {
                    self.workspace.toggle_sort(&column);
                    self.view_reset(true);
                }
            }
            KeyCode::Enter => {
                if let Some(column) = self.selected_column_name() {
                    if self
                        .workspace
                        .begin_edit(self.table_state.selected_row(), &column)
                    {
                        self.input_mode = InputMode::Editing;
                    }
                }
            }
            KeyCode::Char('b') => {
                if let Some(column) = self.selected_column_name() {
                    if self.workspace.filter_kind(&column) == Some(FilterKind::Discrete) {
                        let changed = self.workspace.toggle_blanks(&column);
                        self.view_reset(changed);
                    } else {
                        self.warn(format!("'{}' is filtered by date range", column));
                    }
                }
            }
            KeyCode::Char('v') => {
                if let Some((column, value)) = self.selected_cell() {
                    let changed = match self.workspace.filter_kind(&column) {
                        Some(FilterKind::DateRange) => self.workspace.set_date_range(
                            &column,
                            Some(value.as_str()),
                            Some(value.as_str()),
                        ),
                        Some(FilterKind::Discrete) if classify::is_blank(&value) => {
                            self.workspace.toggle_blanks(&column)
                        }
                        Some(FilterKind::Discrete) => {
                            self.workspace.toggle_filter_value(&column, &value)
                        }
                        None => false,
                    };
                    self.view_reset(changed);
                }
            }
            KeyCode::Char('c') => {
                if let Some(column) = self.selected_column_name() {
                    let changed = self.workspace.clear_filter(&column);
                    self.view_reset(changed);
                }
            }
            KeyCode::Char('C') => {
                let changed = self.workspace.clear_filters();
                self.view_reset(changed);
            }
            KeyCode::Char('S') => {
                let changed = self.workspace.clear_sort();
                self.view_reset(changed);
            }
            _ => {}
        }
    }

    fn selected_card_id(&self) -> Option<String> {
        self.dashboard
            .cards()
            .get(self.selected_card)
            .map(|c| c.id.clone())
    }

    fn clamp_card_selection(&mut self) {
        self.selected_card = self
            .selected_card
            .min(self.dashboard.len().saturating_sub(1));
    }

    /// Next value after `current` in `options`, wrapping around.
    fn cycle_option(options: &[String], current: &str) -> Option<String> {
        if options.is_empty() {
            return None;
        }
        let next = options
            .iter()
            .position(|o| o == current)
            .map(|i| (i + 1) % options.len())
            .unwrap_or(0);
        Some(options[next].clone())
    }

    fn cards_key(&mut self, event: &KeyEvent) {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let shift = event.modifiers.contains(KeyModifiers::SHIFT);
        let selected = self.selected_card_id();
        match event.code {
            KeyCode::Char('a') => match self.dashboard.add() {
                Some(_) => self.selected_card = self.dashboard.len() - 1,
                None if self.dashboard.len() >= self.dashboard.max_cards() => {
                    let max = self.dashboard.max_cards();
                    self.warn(format!("Dashboard is full ({} cards)", max));
                }
                None => self.warn("Need a text and a numeric column to add a card"),
            },
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(id) = selected {
                    self.dashboard.remove(&id);
                    self.clamp_card_selection();
                }
            }
            KeyCode::Char('z') if ctrl => self.undo(),
            KeyCode::Char('y') if ctrl => self.redo(),
            KeyCode::Char('u') => self.undo(),
            KeyCode::Char('r') => self.redo(),
            KeyCode::Char('t') => {
                if let Some(card) = self.dashboard.cards().get(self.selected_card).cloned() {
                    let patch = CardPatch {
                        chart_kind: Some(card.chart_kind.toggled()),
                        ..CardPatch::default()
                    };
                    self.dashboard.update(&card.id, &patch);
                }
            }
            KeyCode::Char('d') | KeyCode::Char('m') => {
                let Some(card) = self.dashboard.cards().get(self.selected_card).cloned() else {
                    return;
                };
                let eligible = self.dashboard.eligible().clone();
                let patch = if event.code == KeyCode::Char('d') {
                    CardPatch {
                        dimension: Self::cycle_option(&eligible.dimensions, &card.dimension),
                        ..CardPatch::default()
                    }
                } else {
                    CardPatch {
                        measure: Self::cycle_option(&eligible.measures, &card.measure),
                        ..CardPatch::default()
                    }
                };
                self.dashboard.update(&card.id, &patch);
            }
            KeyCode::Left if shift => self.reorder_selected(-1),
            KeyCode::Right if shift => self.reorder_selected(1),
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.selected_card + 1 < self.dashboard.len() {
                    self.selected_card += 1;
                }
            }
            KeyCode::Char('e') => {
                let target = self.dashboard.cards().get(self.selected_card + 1).map(|c| c.id.clone());
                if let (Some(source), Some(target)) = (selected, target) {
                    self.dashboard.merge_expand(&source, &target);
                } else {
                    self.warn("Nothing to merge with");
                }
            }
            KeyCode::Char('E') => {
                if let Some(id) = selected {
                    if !self.dashboard.expand_alone(&id) {
                        self.warn("Only a card alone on the last row can expand");
                    }
                }
            }
            _ => {}
        }
    }

    fn reorder_selected(&mut self, delta: isize) {
        let Some(target_idx) = self.selected_card.checked_add_signed(delta) else {
            return;
        };
        let ids = (
            self.selected_card_id(),
            self.dashboard.cards().get(target_idx).map(|c| c.id.clone()),
        );
        if let (Some(dragged), Some(target)) = ids {
            if self.dashboard.reorder(&dragged, &target) {
                self.selected_card = target_idx;
            }
        }
    }

    fn undo(&mut self) {
        if !self.dashboard.undo() {
            tracing::debug!("nothing to undo");
        }
        self.clamp_card_selection();
    }

    fn redo(&mut self) {
        if !self.dashboard.redo() {
            tracing::debug!("nothing to redo");
        }
        self.clamp_card_selection();
    }

    fn render_table(&mut self, area: Rect, buf: &mut Buffer) {
        let page_rows = self.workspace.page_rows();
        let sort = self.workspace.sort_state().cloned();
        let headers: Vec<String> = self
            .workspace
            .columns()
            .iter()
            .map(|name| {
                let direction = sort
                    .as_ref()
                    .filter(|s| &s.column == name)
                    .map(|s| s.direction);
                header_label(name, direction, self.workspace.filters().is_active(name))
            })
            .collect();
        let store = self.workspace.store();
        let rows: Vec<Vec<String>> = page_rows
            .iter()
            .filter_map(|&idx| store.row(idx))
            .map(|row| row.cells().to_vec())
            .collect();

        let mut table = DataTable::new(headers, rows).with_colors(
            self.color("table_header"),
            self.color("controls_bg"),
            self.color("primary"),
        );
        if self.row_numbers {
            let start = (self.workspace.page() - 1) * self.workspace.page_size() + 1;
            table = table.with_row_numbers(start);
        }
        if let Some(edit) = self.workspace.editing() {
            if let Some(page_row) = page_rows.iter().position(|&r| r == edit.row) {
                table = table.with_editing(page_row, edit.value.clone());
            }
        }
        table.render(area, buf, &mut self.table_state);
    }

    fn render_cards(&mut self, area: Rect, buf: &mut Buffer) {
        let pairs: Vec<(String, String)> = self
            .dashboard
            .cards()
            .iter()
            .map(|c| (c.dimension.clone(), c.measure.clone()))
            .collect();
        let series: Vec<AggregatedSeries> = pairs
            .iter()
            .map(|(dimension, measure)| self.workspace.aggregate(dimension, measure).clone())
            .collect();
        let selected = (!self.dashboard.is_empty()).then_some(self.selected_card);
        CardGrid::new(self.dashboard.cards(), &series)
            .with_selected(selected)
            .with_hints(self.hints)
            .with_colors(
                self.color("card_border"),
                self.color("card_border_selected"),
                self.color("chart_bar"),
                self.color("chart_value"),
            )
            .render(area, buf);
    }

    fn debug_line(&self) -> String {
        let history = self.dashboard.history();
        format!(
            "events: {} | history: {}/{} (limit {}) | view generation: {}",
            self.num_events,
            history.cursor() + usize::from(!history.is_empty()),
            history.len(),
            history.limit(),
            self.workspace.view_generation(),
        )
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = vec![Constraint::Fill(1)];
        if self.status.is_some() {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Length(1)); // Controls
        if self.debug {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let main_area = layout[0];
        if self.workspace.columns().is_empty() {
            let text = match &self.pending_path {
                Some(path) => format!("Loading {}", path.display()),
                None => "No data loaded".to_string(),
            };
            Paragraph::new(text)
                .centered()
                .style(Style::default().fg(self.color("dimmed")))
                .render(main_area, buf);
        } else {
            match self.view {
                View::Table => self.render_table(main_area, buf),
                View::Cards => self.render_cards(main_area, buf),
            }
        }

        let mut next = 1;
        if let Some(status) = &self.status {
            let color = match status.level {
                StatusLevel::Info => self.color("success"),
                StatusLevel::Warning => self.color("warning"),
                StatusLevel::Error => self.color("error"),
            };
            Paragraph::new(status.text.as_str())
                .style(Style::default().fg(color))
                .render(layout[next], buf);
            next += 1;
        }

        let mode = match (self.input_mode, self.view) {
            (InputMode::Editing, _) => ControlsMode::Editing,
            (InputMode::Normal, View::Table) => ControlsMode::Table,
            (InputMode::Normal, View::Cards) => ControlsMode::Cards,
        };
        let mut controls = Controls::new(mode)
            .with_colors(self.color("controls_bg"), self.color("primary"))
            .with_row_count(self.workspace.row_count());
        if self.view == View::Table {
            controls = controls.with_page(self.workspace.page(), self.workspace.total_pages());
        }
        controls.render(layout[next], buf);
        next += 1;

        if self.debug {
            Paragraph::new(self.debug_line())
                .style(Style::default().fg(self.color("dimmed")))
                .render(layout[next], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app_with_data() -> App {
        let mut app = App::new(&AppConfig::default(), Theme::default());
        let dataset = Dataset::new(
            vec!["region".into(), "amount".into()],
            vec![
                vec!["EMEA".into(), "10".into()],
                vec!["APAC".into(), "30".into()],
                vec!["".into(), "5".into()],
            ],
        )
        .unwrap();
        app.event(&AppEvent::Loaded(dataset));
        app
    }

    #[test]
    fn test_quit_key() {
        let mut app = app_with_data();
        assert!(matches!(
            app.event(&press(KeyCode::Char('q'))),
            Some(AppEvent::Exit)
        ));
    }

    #[test]
    fn test_cycle_option_wraps() {
        let options = vec!["a".to_string(), "b".to_string()];
        assert_eq!(App::cycle_option(&options, "b"), Some("a".to_string()));
        assert_eq!(App::cycle_option(&options, "zzz"), Some("a".to_string()));
        assert_eq!(App::cycle_option(&[], "a"), None);
    }

    #[test]
    fn test_card_keys_and_undo() {
        let mut app = app_with_data();
        app.event(&press(KeyCode::Tab));
        assert_eq!(app.view(), View::Cards);
        app.event(&press(KeyCode::Char('a')));
        app.event(&press(KeyCode::Char('t')));
        assert_eq!(app.dashboard().cards()[0].chart_kind, ChartKind::Pie);
        app.event(&press(KeyCode::Char('u')));
        assert_eq!(app.dashboard().cards()[0].chart_kind, ChartKind::Bar);
        app.event(&press(KeyCode::Char('r')));
        assert_eq!(app.dashboard().cards()[0].chart_kind, ChartKind::Pie);
    }

    #[test]
    fn test_edit_refreshes_card_columns() {
        let mut app = app_with_data();
        assert_eq!(app.dashboard().eligible().measures, vec!["amount"]);

        app.table_state.selected_column = 1;
        app.event(&press(KeyCode::Enter));
        app.event(&press(KeyCode::Backspace));
        app.event(&press(KeyCode::Backspace));
        app.event(&press(KeyCode::Char('z')));
        app.event(&press(KeyCode::Enter));
        assert_eq!(app.workspace().store().value(0, "amount"), Some("z"));
        assert!(app.dashboard().eligible().measures.is_empty());

        app.event(&press(KeyCode::Tab));
        app.event(&press(KeyCode::Char('a')));
        assert!(app.dashboard().is_empty());
        assert_eq!(
            app.status().map(|s| s.text.as_str()),
            Some("Need a text and a numeric column to add a card")
        );
    }

    #[test]
    fn test_render_does_not_panic() {
        let mut app = app_with_data();
        let area = Rect::new(0, 0, 100, 20);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        app.event(&press(KeyCode::Tab));
        app.event(&press(KeyCode::Char('a')));
        app.event(&press(KeyCode::Char('a')));
        (&mut app).render(area, &mut buf);
    }
}
