//! The editor context: every UI-side model, owned in one place and driven by [`Editor::pump`].

use anyhow::Result;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::asset_lib::AssetType;
use crate::asset_tree::AssetViewTree;
use crate::assertion::AssertionPrompt;
use crate::code_editor::CodeEditor;
use crate::console::{Console, ConsoleEntry, LogChannel};
use crate::engine_thread::EditorLink;
use crate::events::{EditorEvent, IoResponse, ObjectState};
use crate::handle::AssetInstanceHandle;
use crate::message::{AssetIoMessage, Dock, EditorRequest, TimelineIoMessage, WindowIoMessage};
use crate::program_editor::ProgramEditor;
use crate::settings::Settings;
use crate::tab_bar::{CloseOutcome, SavePrompt, TabSignal};
use crate::timeline::{Timeline, TimelineParameter};

pub struct Editor {
    settings: Settings,
    console: Console,
    code_editor: CodeEditor,
    program_editor: ProgramEditor,
    dirty_objects: BTreeSet<AssetInstanceHandle>,
    asset_tree: Option<AssetViewTree>,
    viewing_tree: bool,
    popups: VecDeque<String>,
    application: Option<String>,
    engine_running: bool,
    viewport: (u32, u32),
    timeline: Option<Timeline>,
    master_script: Option<PathBuf>,
    assertion_prompt: Box<dyn AssertionPrompt>,
    link: EditorLink,
}

impl Editor {
    pub fn new(
        link: EditorLink,
        settings: Settings,
        console_capacity: usize,
        assertion_prompt: Box<dyn AssertionPrompt>,
    ) -> Self {
        let requests = link.requests().clone();
        Self {
            settings,
            console: Console::new(console_capacity),
            code_editor: CodeEditor::new(requests.clone()),
            program_editor: ProgramEditor::new(requests),
            dirty_objects: BTreeSet::new(),
            asset_tree: None,
            viewing_tree: false,
            popups: VecDeque::new(),
            application: None,
            engine_running: false,
            viewport: (0, 0),
            timeline: None,
            master_script: None,
            assertion_prompt,
            link,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Console filters may change through the returned reference, so the console snapshot is
    /// dropped.
    pub fn settings_mut(&mut self) -> &mut Settings {
        self.console.invalidate();
        &mut self.settings
    }

    pub fn save_settings(&self, path: &Path) -> Result<()> {
        self.settings.save(path)
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn visible_console(&mut self) -> Arc<[ConsoleEntry]> {
        self.console.visible_entries(&self.settings)
    }

    pub fn code_editor(&self) -> &CodeEditor {
        &self.code_editor
    }

    pub fn code_editor_mut(&mut self) -> &mut CodeEditor {
        &mut self.code_editor
    }

    pub fn program_editor(&self) -> &ProgramEditor {
        &self.program_editor
    }

    pub fn program_editor_mut(&mut self) -> &mut ProgramEditor {
        &mut self.program_editor
    }

    pub fn dirty_objects(&self) -> &BTreeSet<AssetInstanceHandle> {
        &self.dirty_objects
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.dirty_objects.is_empty()
    }

    pub fn asset_tree(&self) -> Option<&AssetViewTree> {
        self.asset_tree.as_ref()
    }

    pub fn application_name(&self) -> Option<&str> {
        self.application.as_deref()
    }

    pub fn is_engine_running(&self) -> bool {
        self.engine_running
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Last timeline the engine reported, if any was queried yet.
    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    pub fn master_script(&self) -> Option<&Path> {
        self.master_script.as_deref()
    }

    pub fn take_popups(&mut self) -> Vec<String> {
        self.popups.drain(..).collect()
    }

    /// Posts a raw request to the engine thread.
    pub fn post(&self, request: EditorRequest) -> bool {
        self.link.post(request)
    }

    pub fn open_asset(&self, path: impl Into<PathBuf>) -> bool {
        self.link.post(EditorRequest::Asset(Dock::AssetLibrary, AssetIoMessage::OpenAsset { path: path.into() }))
    }

    pub fn new_asset(&self, path: impl Into<PathBuf>, asset_type: AssetType) -> bool {
        self.link.post(EditorRequest::Asset(
            Dock::AssetLibrary,
            AssetIoMessage::NewAsset { path: path.into(), asset_type },
        ))
    }

    pub fn start_asset_tree(&mut self) -> bool {
        self.viewing_tree = true;
        self.link.post(EditorRequest::Asset(Dock::AssetLibrary, AssetIoMessage::QueryStartViewAssetTree))
    }

    pub fn stop_asset_tree(&mut self) -> bool {
        self.viewing_tree = false;
        self.asset_tree = None;
        self.link.post(EditorRequest::Asset(Dock::AssetLibrary, AssetIoMessage::QueryStopViewAssetTree))
    }

    pub fn resize_viewport(&self, width: u32, height: u32) -> bool {
        self.link.post(EditorRequest::Window(WindowIoMessage::ResizeViewport { width, height }))
    }

    pub fn redraw(&self) -> bool {
        self.link.post(EditorRequest::Window(WindowIoMessage::Redraw))
    }

    pub fn query_timeline(&self) -> bool {
        self.post_timeline(TimelineIoMessage::QueryTimeline)
    }

    pub fn add_timeline_lane(&self) -> bool {
        self.post_timeline(TimelineIoMessage::AddLane)
    }

    pub fn add_timeline_block(&self, lane: usize, name: &str, class_name: &str, beat: u32, duration: u32) -> bool {
        self.post_timeline(TimelineIoMessage::AddBlock {
            lane,
            name: name.to_string(),
            class_name: class_name.to_string(),
            beat,
            duration,
        })
    }

    pub fn set_block_script(&self, block: u32, path: impl Into<PathBuf>) -> bool {
        self.post_timeline(TimelineIoMessage::SetBlockScript { block, path: path.into() })
    }

    pub fn clear_block_script(&self, block: u32) -> bool {
        self.post_timeline(TimelineIoMessage::ClearBlockScript { block })
    }

    pub fn set_master_script(&self, path: impl Into<PathBuf>) -> bool {
        self.post_timeline(TimelineIoMessage::SetMasterScript { path: path.into() })
    }

    pub fn clear_master_script(&self) -> bool {
        self.post_timeline(TimelineIoMessage::ClearMasterScript)
    }

    pub fn set_timeline_parameter(&self, parameter: TimelineParameter) -> bool {
        self.post_timeline(TimelineIoMessage::SetParameter(parameter))
    }

    fn post_timeline(&self, message: TimelineIoMessage) -> bool {
        self.link.post(EditorRequest::Timeline(Dock::Timeline, message))
    }

    /// Gives up the engine link, e.g. for [`EngineThread::shutdown_with`].
    ///
    /// [`EngineThread::shutdown_with`]: crate::engine_thread::EngineThread::shutdown_with
    pub fn into_link(self) -> EditorLink {
        self.link
    }

    pub fn shutdown_engine(&self) -> bool {
        self.link.post(EditorRequest::Shutdown)
    }

    /// Requests closing every open tab in both editors. Returns true when nothing is left open
    /// or waiting on a save.
    pub fn close_all(&mut self, prompt: &mut dyn SavePrompt) -> bool {
        let mut all_closed = true;
        let code: Vec<_> = self.code_editor.tabs().handles().collect();
        for handle in code {
            all_closed &= self.code_editor.request_close(handle, prompt) == CloseOutcome::Closed;
        }
        let programs: Vec<_> = self.program_editor.tabs().handles().collect();
        for handle in programs {
            all_closed &= self.program_editor.request_close(handle, prompt) == CloseOutcome::Closed;
        }
        self.collect_dirty_signals();
        all_closed
    }

    /// Applies every queued engine event. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let events = self.link.drain_events();
        let count = events.len();
        for event in events {
            self.route(event);
        }
        count
    }

    /// Applies events as they arrive until `until` matches one (checked before it is applied)
    /// or the timeout passes.
    pub fn pump_until(&mut self, timeout: Duration, mut until: impl FnMut(&EditorEvent) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(event) = self.link.recv_timeout(remaining) else {
                return false;
            };
            let matched = until(&event);
            self.route(event);
            if matched {
                return true;
            }
        }
    }

    fn route(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::Log { channel, message } => self.console.push(channel, message),
            EditorEvent::Assertion(request) => {
                let choice = self.assertion_prompt.ask(&request);
                self.console.push(
                    LogChannel::Editor,
                    format!("assertion at {}:{} answered {choice:?}", request.file, request.line),
                );
                request.respond(choice);
            }
            EditorEvent::ApplicationLoaded { name } => {
                self.console.push(LogChannel::Editor, format!("application '{name}' running"));
                self.application = Some(name);
                self.engine_running = true;
            }
            EditorEvent::ApplicationLoadFailed { error } => self.popups.push_back(error.to_string()),
            EditorEvent::ApplicationStopped => self.engine_running = false,
            EditorEvent::ObjectOpened { handle, display_name, state } => match state {
                ObjectState::Code { .. } => {
                    self.code_editor.open(handle, &display_name, &state);
                }
                ObjectState::Program { .. } => {
                    self.program_editor.open(handle, &display_name, &state);
                }
            },
            EditorEvent::ErrorPopup { message } => self.popups.push_back(message),
            EditorEvent::AssetTree(tree) => {
                if self.viewing_tree {
                    self.asset_tree = Some(tree);
                }
            }
            EditorEvent::UpdateNodeViews => {
                if self.viewing_tree {
                    self.link.post(EditorRequest::Asset(
                        Dock::AssetLibrary,
                        AssetIoMessage::QueryRefreshViewAssetTree,
                    ));
                }
            }
            EditorEvent::ViewportResized { width, height } => self.viewport = (width, height),
            EditorEvent::TimelineView(timeline) => self.timeline = Some(timeline),
            EditorEvent::MasterScriptState { path } => self.master_script = path,
            EditorEvent::Io {
                sender: Dock::AssetLibrary | Dock::Shell,
                response: IoResponse::NewError | IoResponse::SaveError,
                detail,
                ..
            } => {
                self.popups.push_back(detail.unwrap_or_else(|| "asset operation failed".to_string()));
            }
            other => {
                self.code_editor.handle_event(&other);
                self.program_editor.handle_event(&other);
            }
        }
        self.collect_dirty_signals();
    }

    fn collect_dirty_signals(&mut self) {
        let signals =
            self.code_editor.take_dirty_signals().into_iter().chain(self.program_editor.take_dirty_signals());
        for signal in signals {
            match signal {
                TabSignal::RegisterDirtyObject(handle) => {
                    self.dirty_objects.insert(handle);
                }
                TabSignal::UnregisterDirtyObject(handle) => {
                    self.dirty_objects.remove(&handle);
                }
                _ => {}
            }
        }
    }
}
