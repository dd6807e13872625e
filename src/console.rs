use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::settings::Settings;

/// Engine log channels, serialized with their four-character codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogChannel {
    #[serde(rename = "CRIT")]
    Critical,
    #[serde(rename = "ASRT")]
    Assert,
    #[serde(rename = "ERR_")]
    Error,
    #[serde(rename = "WARN")]
    Warning,
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "SHDR")]
    Shader,
    #[serde(rename = "TMLN")]
    Timeline,
    #[serde(rename = "EDIT")]
    Editor,
    #[serde(rename = "APP_")]
    App,
}

impl LogChannel {
    pub const ALL: [LogChannel; 9] = [
        LogChannel::Critical,
        LogChannel::Assert,
        LogChannel::Error,
        LogChannel::Warning,
        LogChannel::Info,
        LogChannel::Shader,
        LogChannel::Timeline,
        LogChannel::Editor,
        LogChannel::App,
    ];

    pub fn code(self) -> &'static str {
        match self {
            LogChannel::Critical => "CRIT",
            LogChannel::Assert => "ASRT",
            LogChannel::Error => "ERR_",
            LogChannel::Warning => "WARN",
            LogChannel::Info => "INFO",
            LogChannel::Shader => "SHDR",
            LogChannel::Timeline => "TMLN",
            LogChannel::Editor => "EDIT",
            LogChannel::App => "APP_",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.code().eq_ignore_ascii_case(code))
    }

    pub fn level(self) -> log::Level {
        match self {
            LogChannel::Critical | LogChannel::Assert | LogChannel::Error => log::Level::Error,
            LogChannel::Warning => log::Level::Warn,
            _ => log::Level::Info,
        }
    }
}

impl fmt::Display for LogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    pub channel: LogChannel,
    pub text: String,
}

/// Bounded log view fed by engine and editor log events.
#[derive(Debug)]
pub struct Console {
    entries: VecDeque<ConsoleEntry>,
    capacity: usize,
    snapshot: Option<Arc<[ConsoleEntry]>>,
}

impl Console {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::new(), capacity: capacity.max(1), snapshot: None }
    }

    pub fn push(&mut self, channel: LogChannel, text: impl Into<String>) {
        self.entries.push_back(ConsoleEntry { channel, text: text.into() });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.snapshot = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.snapshot = None;
    }

    /// Entries whose channel passes the console filters in `settings`. The snapshot is cached
    /// until the next push; call [`Console::invalidate`] after changing filters.
    pub fn visible_entries(&mut self, settings: &Settings) -> Arc<[ConsoleEntry]> {
        if let Some(cache) = &self.snapshot {
            return Arc::clone(cache);
        }
        let data: Vec<ConsoleEntry> = self
            .entries
            .iter()
            .filter(|entry| settings.console_filter_state(entry.channel))
            .cloned()
            .collect();
        let arc: Arc<[ConsoleEntry]> = Arc::from(data.into_boxed_slice());
        self.snapshot = Some(Arc::clone(&arc));
        arc
    }

    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }
}
