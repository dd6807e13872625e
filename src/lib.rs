pub mod application;
pub mod assertion;
pub mod asset_lib;
pub mod asset_tree;
pub mod cli;
pub mod code_editor;
pub mod compiler_events;
pub mod config;
pub mod console;
pub mod controllers;
pub mod document;
pub mod editor;
pub mod engine_thread;
pub mod events;
pub mod graph;
pub mod handle;
pub mod handle_map;
pub mod message;
pub mod program;
pub mod program_editor;
pub mod runtime;
pub mod settings;
pub mod shell;
pub mod source_code;
pub mod split_view;
pub mod tab_bar;
pub mod throttle;
pub mod timeline;

use anyhow::{Context, Result};
use std::io;
use std::time::Duration;

use crate::application::ApplicationSource;
use crate::cli::CliOverrides;
use crate::config::EditorConfig;
use crate::editor::Editor;
use crate::engine_thread::{EngineOptions, EngineThread};
use crate::settings::Settings;
use crate::shell::{Shell, StdinAssertionPrompt};

pub use crate::handle::AssetInstanceHandle;
pub use crate::handle_map::HandleMap;

const SHELL_SETTLE: Duration = Duration::from_millis(500);

/// Starts the engine thread and runs the shell on stdin until `quit`.
pub fn run(cli: CliOverrides) -> Result<()> {
    let config_path = cli.config_path();
    let overrides = cli.into_config_overrides();
    let mut config = EditorConfig::load_or_default(&config_path);
    if !overrides.is_empty() {
        log::info!("[config] command line overrides: {}", overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&overrides);

    let settings = Settings::load_or_default(&config.settings_path);
    let (mut engine, link) = EngineThread::spawn(EngineOptions {
        asset_root: config.asset_root.clone(),
        application: ApplicationSource::from_option(config.engine.application.clone()),
        tick: config.engine.tick(),
    })?;

    let mut editor = Editor::new(link, settings, config.console.capacity, Box::new(StdinAssertionPrompt));
    editor.pump_until(SHELL_SETTLE, |event| {
        matches!(event, events::EditorEvent::ApplicationLoaded { .. })
    });

    let mut stdout = io::stdout();
    Shell::new(&mut editor, SHELL_SETTLE).run(shell::stdin_lines(), &mut stdout)?;

    editor
        .save_settings(&config.settings_path)
        .with_context(|| format!("saving settings to {}", config.settings_path.display()))?;
    engine.shutdown_with(editor.into_link());
    Ok(())
}
