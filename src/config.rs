use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/editor.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_tick_ms")]
    pub tick_ms: u64,
    /// Dynamic library to run; the built-in application is used when unset.
    #[serde(default)]
    pub application: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "ConsoleConfig::default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "EditorConfig::default_asset_root")]
    pub asset_root: PathBuf,
    #[serde(default = "EditorConfig::default_settings_path")]
    pub settings_path: PathBuf,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorConfigOverrides {
    pub asset_root: Option<PathBuf>,
    pub application: Option<PathBuf>,
    pub tick_ms: Option<u64>,
    pub settings_path: Option<PathBuf>,
}

impl EngineConfig {
    const fn default_tick_ms() -> u64 {
        16
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { tick_ms: Self::default_tick_ms(), application: None }
    }
}

impl ConsoleConfig {
    const fn default_capacity() -> usize {
        512
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { capacity: Self::default_capacity() }
    }
}

impl EditorConfig {
    fn default_asset_root() -> PathBuf {
        PathBuf::from("assets")
    }

    fn default_settings_path() -> PathBuf {
        PathBuf::from("config/editor_settings.json")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("[config] {} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("[config] {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &EditorConfigOverrides) {
        if let Some(root) = &overrides.asset_root {
            self.asset_root = root.clone();
        }
        if let Some(application) = &overrides.application {
            self.engine.application = Some(application.clone());
        }
        if let Some(tick_ms) = overrides.tick_ms {
            self.engine.tick_ms = tick_ms;
        }
        if let Some(settings_path) = &overrides.settings_path {
            self.settings_path = settings_path.clone();
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            asset_root: Self::default_asset_root(),
            settings_path: Self::default_settings_path(),
            engine: EngineConfig::default(),
            console: ConsoleConfig::default(),
        }
    }
}

impl EditorConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.asset_root.is_none()
            && self.application.is_none()
            && self.tick_ms.is_none()
            && self.settings_path.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.asset_root.is_some() {
            fields.push("assets");
        }
        if self.application.is_some() {
            fields.push("app");
        }
        if self.tick_ms.is_some() {
            fields.push("tick-ms");
        }
        if self.settings_path.is_some() {
            fields.push("settings");
        }
        fields
    }
}
