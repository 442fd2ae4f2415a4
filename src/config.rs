use crate::aggregate::LabelHints;
use crate::cards::{ChartKind, DEFAULT_MAX_CARDS};
use crate::history::DEFAULT_HISTORY_LIMIT;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use supports_color::Stream;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_CARDS_LIMIT: usize = 12;
const CONFIG_FILE: &str = "config.toml";

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Commented default configuration, every setting disabled
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the default configuration to config.toml
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path(CONFIG_FILE);

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;
        tracing::info!(path = %config_path.display(), "wrote default config");

        Ok(config_path)
    }

    /// Read and parse config.toml. A missing file yields the defaults.
    pub fn load_file(&self) -> Result<AppConfig> {
        let config_path = self.config_path(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub display: DisplayConfig,
    pub layout: LayoutConfig,
    pub history: HistoryConfig,
    pub sort: SortConfig,
    pub chart: ChartConfig,
    pub theme: ThemeConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub page_size: usize,
    pub row_numbers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub max_cards: usize,
    pub default_chart_kind: ChartKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub status_order: Vec<String>,
    pub tri_state: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub min_label_width: u16,
    pub max_horizontal_labels: usize,
    pub rotated_label_angle: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub primary: String,
    pub secondary: String,
    pub success: String,
    pub error: String,
    pub warning: String,
    pub dimmed: String,
    pub controls_bg: String,
    pub table_header: String,
    pub card_border: String,
    pub card_border_selected: String,
    pub chart_bar: String,
    pub chart_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            display: DisplayConfig::default(),
            layout: LayoutConfig::default(),
            history: HistoryConfig::default(),
            sort: SortConfig::default(),
            chart: ChartConfig::default(),
            theme: ThemeConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            row_numbers: false,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_cards: DEFAULT_MAX_CARDS,
            default_chart_kind: ChartKind::Bar,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            status_order: vec![
                "pending".to_string(),
                "approved".to_string(),
                "rejected".to_string(),
            ],
            tri_state: false,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        let hints = LabelHints::default();
        Self {
            min_label_width: hints.min_label_width,
            max_horizontal_labels: hints.max_horizontal_labels,
            rotated_label_angle: hints.rotated_angle,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            primary: "cyan".to_string(),
            secondary: "yellow".to_string(),
            success: "green".to_string(),
            error: "red".to_string(),
            warning: "yellow".to_string(),
            dimmed: "dark_gray".to_string(),
            controls_bg: "indexed(236)".to_string(),
            table_header: "white".to_string(),
            card_border: "dark_gray".to_string(),
            card_border_selected: "cyan".to_string(),
            chart_bar: "cyan".to_string(),
            chart_value: "white".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let mut config = AppConfig::default();

        let manager = ConfigManager::new(app_name)?;
        config.merge(manager.load_file()?);
        config.validate()?;

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.display.merge(other.display);
        self.layout.merge(other.layout);
        self.history.merge(other.history);
        self.sort.merge(other.sort);
        self.chart.merge(other.chart);
        self.theme.colors.merge(other.theme.colors);
        self.debug.merge(other.debug);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.display.page_size == 0 {
            return Err(eyre!("page_size must be greater than 0"));
        }

        if !(1..=MAX_CARDS_LIMIT).contains(&self.layout.max_cards) {
            return Err(eyre!(
                "max_cards must be between 1 and {}, got {}",
                MAX_CARDS_LIMIT,
                self.layout.max_cards
            ));
        }

        if self.history.limit < 2 {
            return Err(eyre!(
                "history limit must be at least 2, got {}",
                self.history.limit
            ));
        }

        if self.chart.max_horizontal_labels == 0 {
            return Err(eyre!("max_horizontal_labels must be greater than 0"));
        }

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }

    /// Apply command-line overrides. Call `validate` afterwards.
    pub fn apply_cli(&mut self, args: &dashdeck_cli::Args) {
        if let Some(delimiter) = args.delimiter {
            self.file_loading.delimiter = Some(delimiter);
        }
        if let Some(no_header) = args.no_header {
            self.file_loading.has_header = Some(!no_header);
        }
        if let Some(page_size) = args.page_size {
            self.display.page_size = page_size;
        }
        if let Some(max_cards) = args.max_cards {
            self.layout.max_cards = max_cards;
        }
        if let Some(limit) = args.history_limit {
            self.history.limit = limit;
        }
        if args.debug {
            self.debug.enabled = true;
        }
    }

    pub fn label_hints(&self) -> LabelHints {
        LabelHints {
            min_label_width: self.chart.min_label_width,
            max_horizontal_labels: self.chart.max_horizontal_labels,
            rotated_angle: self.chart.rotated_label_angle,
        }
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.page_size != default.page_size {
            self.page_size = other.page_size;
        }
        if other.row_numbers != default.row_numbers {
            self.row_numbers = other.row_numbers;
        }
    }
}

impl LayoutConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LayoutConfig::default();
        if other.max_cards != default.max_cards {
            self.max_cards = other.max_cards;
        }
        if other.default_chart_kind != default.default_chart_kind {
            self.default_chart_kind = other.default_chart_kind;
        }
    }
}

impl HistoryConfig {
    pub fn merge(&mut self, other: Self) {
        if other.limit != HistoryConfig::default().limit {
            self.limit = other.limit;
        }
    }
}

impl SortConfig {
    pub fn merge(&mut self, other: Self) {
        let default = SortConfig::default();
        if other.status_order != default.status_order {
            self.status_order = other.status_order;
        }
        if other.tri_state != default.tri_state {
            self.tri_state = other.tri_state;
        }
    }
}

impl ChartConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartConfig::default();
        if other.min_label_width != default.min_label_width {
            self.min_label_width = other.min_label_width;
        }
        if other.max_horizontal_labels != default.max_horizontal_labels {
            self.max_horizontal_labels = other.max_horizontal_labels;
        }
        if other.rotated_label_angle != default.rotated_label_angle {
            self.rotated_label_angle = other.rotated_label_angle;
        }
    }
}

impl ColorConfig {
    /// Every color setting with its config key.
    fn entries(&self) -> [(&'static str, &String); 12] {
        [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("success", &self.success),
            ("error", &self.error),
            ("warning", &self.warning),
            ("dimmed", &self.dimmed),
            ("controls_bg", &self.controls_bg),
            ("table_header", &self.table_header),
            ("card_border", &self.card_border),
            ("card_border_selected", &self.card_border_selected),
            ("chart_bar", &self.chart_bar),
            ("chart_value", &self.chart_value),
        ]
    }

    fn entries_mut(&mut self) -> [(&'static str, &mut String); 12] {
        [
            ("primary", &mut self.primary),
            ("secondary", &mut self.secondary),
            ("success", &mut self.success),
            ("error", &mut self.error),
            ("warning", &mut self.warning),
            ("dimmed", &mut self.dimmed),
            ("controls_bg", &mut self.controls_bg),
            ("table_header", &mut self.table_header),
            ("card_border", &mut self.card_border),
            ("card_border_selected", &mut self.card_border_selected),
            ("chart_bar", &mut self.chart_bar),
            ("chart_value", &mut self.chart_value),
        ]
    }

    /// Validate all color strings can be parsed
    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (name, value) in self.entries() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))?;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        let overrides = other.entries();
        let defaults = default.entries();
        for ((_, current), ((_, theirs), (_, base))) in self
            .entries_mut()
            .into_iter()
            .zip(overrides.into_iter().zip(defaults))
        {
            if theirs != base {
                *current = theirs.clone();
            }
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    /// Create a new ColorParser with automatic terminal capability detection
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parse a color string (hex, indexed or named) into a terminal color
    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }

        let trimmed = s.trim();

        if trimmed.starts_with('#') && trimmed.len() == 7 {
            let (r, g, b) = parse_hex(trimmed)?;
            return Ok(self.convert_rgb_to_terminal_color(r, g, b));
        }

        let lower = trimmed.to_lowercase();
        if let Some(inner) = lower
            .strip_prefix("indexed(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let num = inner.trim().parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(Color::Indexed(num));
        }

        match lower.as_str() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),

            "bright_black" | "bright black" => Ok(Color::Indexed(8)),
            "bright_red" | "bright red" => Ok(Color::Indexed(9)),
            "bright_green" | "bright green" => Ok(Color::Indexed(10)),
            "bright_yellow" | "bright yellow" => Ok(Color::Indexed(11)),
            "bright_blue" | "bright blue" => Ok(Color::Indexed(12)),
            "bright_magenta" | "bright magenta" => Ok(Color::Indexed(13)),
            "bright_cyan" | "bright cyan" => Ok(Color::Indexed(14)),
            "bright_white" | "bright white" => Ok(Color::Indexed(15)),

            "gray" | "grey" | "dark_gray" | "dark gray" | "dark_grey" | "dark grey" => {
                Ok(Color::Indexed(8))
            }
            "light_gray" | "light gray" | "light_grey" | "light grey" => Ok(Color::Indexed(7)),

            // Rendered as a style modifier rather than a color
            "reset" | "reversed" => Ok(Color::Reset),

            _ => Err(eyre!(
                "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                 bright variants (bright_red, etc.), indexed(0-255) or hex colors (#ff0000)",
                trimmed
            )),
        }
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    let digits = s
        .strip_prefix('#')
        .filter(|d| d.len() == 6 && d.is_ascii())
        .ok_or_else(|| eyre!("Invalid hex color format: '{}'. Expected format: #rrggbb", s))?;

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| eyre!("Invalid hex color component in {}", s))
    };

    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Nearest index in the xterm 256-color palette
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 10 {
        // Grayscale ramp 232-255
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        return match gray {
            0..=7 => 16,
            248..=u16::MAX => 231,
            _ => 232 + ((gray - 8) * 24 / 240) as u8,
        };
    }

    // 6x6x6 color cube 16-231
    let scale = |c: u8| (c as u16 * 5 / 255) as u8;
    16 + 36 * scale(r) + 6 * scale(g) + scale(b)
}

/// Nearest of the 8 basic ANSI colors
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 30 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        return if avg < 64 { Color::Black } else { Color::White };
    }

    match (r > 128, g > 128, b > 128) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

/// Parsed theme colors keyed by their config name
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let parser = ColorParser::new();
        let colors = config
            .colors
            .entries()
            .into_iter()
            .map(|(name, value)| Ok((name.to_string(), parser.parse(value)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self { colors })
    }

    /// Color by name, Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    pub fn get_optional(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }
}

impl Default for Theme {
    fn default() -> Self {
        let colors = ColorConfig::default();
        let parser = ColorParser::new();
        Self {
            colors: colors
                .entries()
                .into_iter()
                .map(|(name, value)| (name.to_string(), parser.parse(value).unwrap_or(Color::Reset)))
                .collect(),
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(parsed.version, "0.1");
        assert_eq!(parsed.display.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(parsed.layout.max_cards, DEFAULT_MAX_CARDS);
    }

    #[test]
    fn test_color_merge_only_takes_overrides() {
        let mut base = ColorConfig {
            primary: "blue".to_string(),
            ..ColorConfig::default()
        };
        let other = ColorConfig {
            chart_bar: "magenta".to_string(),
            ..ColorConfig::default()
        };
        base.merge(other);
        assert_eq!(base.primary, "blue");
        assert_eq!(base.chart_bar, "magenta");
    }

    #[test]
    fn test_rgb_helpers() {
        assert_eq!(rgb_to_256_color(0, 0, 0), 16);
        assert_eq!(rgb_to_256_color(255, 0, 0), 196);
        assert_eq!(rgb_to_basic_ansi(200, 20, 20), Color::Red);
        assert_eq!(rgb_to_basic_ansi(250, 250, 250), Color::White);
    }
}
