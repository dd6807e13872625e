//! Persisted user preferences. Stored as JSON next to the editor config.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::console::LogChannel;

pub const FONT_SIZE_RANGE: (u32, u32) = (6, 72);
pub const TAB_SIZE_RANGE: (u32, u32) = (1, 16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("Invalid color '{value}'. Use #rrggbb.");
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16);
        Ok(Self { r: channel(0..2)?, g: channel(2..4)?, b: channel(4..6)? })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Color::parse(&value).map_err(|err| err.to_string())
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxStyle {
    Background,
    CppComment,
    CComment,
    NormalText,
    Keyword,
    NumberValue,
    LineNumberBackground,
    LineNumber,
    SelectedLineBackground,
}

impl SyntaxStyle {
    pub const ALL: [SyntaxStyle; 9] = [
        SyntaxStyle::Background,
        SyntaxStyle::CppComment,
        SyntaxStyle::CComment,
        SyntaxStyle::NormalText,
        SyntaxStyle::Keyword,
        SyntaxStyle::NumberValue,
        SyntaxStyle::LineNumberBackground,
        SyntaxStyle::LineNumber,
        SyntaxStyle::SelectedLineBackground,
    ];

    pub fn default_color(self) -> Color {
        match self {
            SyntaxStyle::Background => Color::rgb(0, 0, 0),
            SyntaxStyle::CppComment => Color::rgb(20, 255, 20),
            SyntaxStyle::CComment => Color::rgb(0, 255, 0),
            SyntaxStyle::NormalText => Color::rgb(255, 255, 255),
            SyntaxStyle::Keyword => Color::rgb(130, 255, 50),
            SyntaxStyle::NumberValue => Color::rgb(230, 54, 0),
            SyntaxStyle::LineNumberBackground => Color::rgb(30, 30, 30),
            SyntaxStyle::LineNumber => Color::rgb(140, 140, 140),
            SyntaxStyle::SelectedLineBackground => Color::rgb(40, 40, 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceSettings {
    #[serde(default = "AppearanceSettings::default_widget_style")]
    pub widget_style: String,
    #[serde(default = "default_true")]
    pub use_widget_style_palette: bool,
    #[serde(default = "default_true")]
    pub use_timeline_antialiasing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "ConsoleSettings::default_background")]
    pub background_color: Color,
    #[serde(default = "ConsoleSettings::default_text")]
    pub text_default_color: Color,
    #[serde(default)]
    pub channel_filters: BTreeMap<LogChannel, bool>,
    #[serde(default)]
    pub channel_colors: BTreeMap<LogChannel, Color>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEditorSettings {
    #[serde(default = "CodeEditorSettings::default_font_size")]
    pub font_size: u32,
    #[serde(default = "CodeEditorSettings::default_tab_size")]
    pub tab_size: u32,
    #[serde(default)]
    pub syntax_colors: BTreeMap<SyntaxStyle, Color>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub appearance: AppearanceSettings,
    #[serde(default)]
    pub console: ConsoleSettings,
    #[serde(default)]
    pub code_editor: CodeEditorSettings,
    #[serde(skip)]
    style_revision: u64,
}

fn default_true() -> bool {
    true
}

impl AppearanceSettings {
    fn default_widget_style() -> String {
        "Fusion (dark)".to_string()
    }
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            widget_style: Self::default_widget_style(),
            use_widget_style_palette: true,
            use_timeline_antialiasing: true,
        }
    }
}

impl ConsoleSettings {
    const fn default_background() -> Color {
        Color::rgb(0, 0, 48)
    }

    const fn default_text() -> Color {
        Color::rgb(255, 255, 0)
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            background_color: Self::default_background(),
            text_default_color: Self::default_text(),
            channel_filters: BTreeMap::new(),
            channel_colors: BTreeMap::new(),
        }
    }
}

impl CodeEditorSettings {
    const fn default_font_size() -> u32 {
        11
    }

    const fn default_tab_size() -> u32 {
        4
    }
}

impl Default for CodeEditorSettings {
    fn default() -> Self {
        Self {
            font_size: Self::default_font_size(),
            tab_size: Self::default_tab_size(),
            syntax_colors: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let mut settings: Settings = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.code_editor.font_size = clamp(settings.code_editor.font_size, FONT_SIZE_RANGE);
        settings.code_editor.tab_size = clamp(settings.code_editor.tab_size, TAB_SIZE_RANGE);
        Ok(settings)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("[settings] {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings file {}", path.display()))
    }

    /// Channels without an explicit filter entry are visible.
    pub fn console_filter_state(&self, channel: LogChannel) -> bool {
        self.console.channel_filters.get(&channel).copied().unwrap_or(true)
    }

    pub fn set_console_filter_state(&mut self, channel: LogChannel, visible: bool) {
        self.console.channel_filters.insert(channel, visible);
    }

    pub fn reset_console_filters(&mut self) {
        self.console.channel_filters.clear();
    }

    pub fn console_text_color(&self, channel: LogChannel) -> Color {
        self.console.channel_colors.get(&channel).copied().unwrap_or(self.console.text_default_color)
    }

    pub fn set_console_text_color(&mut self, channel: LogChannel, color: Color) {
        self.console.channel_colors.insert(channel, color);
    }

    pub fn reset_console_text_colors(&mut self) {
        self.console.channel_colors.clear();
    }

    pub fn syntax_color(&self, style: SyntaxStyle) -> Color {
        self.code_editor.syntax_colors.get(&style).copied().unwrap_or_else(|| style.default_color())
    }

    pub fn set_syntax_color(&mut self, style: SyntaxStyle, color: Color) {
        self.code_editor.syntax_colors.insert(style, color);
        self.style_revision += 1;
    }

    pub fn set_code_editor_font_size(&mut self, size: u32) {
        self.code_editor.font_size = clamp(size, FONT_SIZE_RANGE);
        self.style_revision += 1;
    }

    pub fn set_code_editor_tab_size(&mut self, size: u32) {
        self.code_editor.tab_size = clamp(size, TAB_SIZE_RANGE);
        self.style_revision += 1;
    }

    /// Bumped whenever a code editor style setting changes; views compare it to re-style.
    pub fn style_revision(&self) -> u64 {
        self.style_revision
    }
}

fn clamp(value: u32, (min, max): (u32, u32)) -> u32 {
    value.clamp(min, max)
}
