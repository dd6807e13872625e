use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc;

use crate::application::LoadingError;
use crate::asset_lib::IoError;
use crate::asset_tree::AssetViewTree;
use crate::assertion::AssertionRequest;
use crate::console::LogChannel;
use crate::graph::GraphNode;
use crate::handle::AssetInstanceHandle;
use crate::message::Dock;
use crate::program::{LinkingEventKind, ProgramShaderRef};
use crate::source_code::{CompilationPolicy, SourceKind};
use crate::timeline::Timeline;

/// Snapshot of an engine object handed to the UI when it is opened or reloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectState {
    Code { kind: SourceKind, source: String, policy: CompilationPolicy },
    Program { name: String, shaders: Vec<ProgramShaderRef>, valid: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoResponse {
    SaveSuccess,
    SaveError,
    NewSuccess,
    NewError,
}

/// Everything the engine thread reports back to the UI thread.
#[derive(Debug)]
pub enum EditorEvent {
    ApplicationLoaded { name: String },
    ApplicationLoadFailed { error: LoadingError },
    ApplicationStopped,
    ObjectOpened { handle: AssetInstanceHandle, display_name: String, state: ObjectState },
    ObjectClosed { handle: AssetInstanceHandle },
    ObjectReloaded { handle: AssetInstanceHandle, state: ObjectState },
    UpdateNodeViews,
    Io { sender: Dock, handle: AssetInstanceHandle, response: IoResponse, detail: Option<String> },
    ErrorPopup { message: String },
    CompilationBegin { handle: AssetInstanceHandle },
    CompilationError { handle: AssetInstanceHandle, row: u32, message: String },
    CompilationEnd { handle: AssetInstanceHandle, success: bool, log: String },
    Linking { handle: AssetInstanceHandle, kind: LinkingEventKind, log: String },
    FileOperation { handle: AssetInstanceHandle, error: Option<IoError> },
    CompilationRequestEnded,
    RedrawViewports,
    UpdateProgramView { handle: AssetInstanceHandle, state: ObjectState },
    AssetTree(AssetViewTree),
    GraphView { handle: AssetInstanceHandle, root: GraphNode },
    ViewportResized { width: u32, height: u32 },
    /// Snapshot pushed whenever the timeline changes; views repaint from it.
    TimelineView(Timeline),
    MasterScriptState { path: Option<PathBuf> },
    Log { channel: LogChannel, message: String },
    Assertion(AssertionRequest),
}

impl fmt::Display for EditorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorEvent::ApplicationLoaded { name } => write!(f, "ApplicationLoaded name={name}"),
            EditorEvent::ApplicationLoadFailed { error } => write!(f, "ApplicationLoadFailed {error}"),
            EditorEvent::ApplicationStopped => write!(f, "ApplicationStopped"),
            EditorEvent::ObjectOpened { handle, display_name, .. } => {
                write!(f, "ObjectOpened handle={handle} name={display_name}")
            }
            EditorEvent::ObjectClosed { handle } => write!(f, "ObjectClosed handle={handle}"),
            EditorEvent::ObjectReloaded { handle, .. } => write!(f, "ObjectReloaded handle={handle}"),
            EditorEvent::UpdateNodeViews => write!(f, "UpdateNodeViews"),
            EditorEvent::Io { sender, handle, response, detail } => {
                write!(f, "Io sender={sender:?} handle={handle} response={response:?}")?;
                if let Some(detail) = detail {
                    write!(f, " detail={detail}")?;
                }
                Ok(())
            }
            EditorEvent::ErrorPopup { message } => write!(f, "ErrorPopup {message}"),
            EditorEvent::CompilationBegin { handle } => write!(f, "CompilationBegin handle={handle}"),
            EditorEvent::CompilationError { handle, row, message } => {
                write!(f, "CompilationError handle={handle} row={row} {message}")
            }
            EditorEvent::CompilationEnd { handle, success, .. } => {
                write!(f, "CompilationEnd handle={handle} success={success}")
            }
            EditorEvent::Linking { handle, kind, .. } => write!(f, "Linking handle={handle} kind={kind:?}"),
            EditorEvent::FileOperation { handle, error } => match error {
                None => write!(f, "FileOperation handle={handle} saved"),
                Some(err) => write!(f, "FileOperation handle={handle} error={err}"),
            },
            EditorEvent::CompilationRequestEnded => write!(f, "CompilationRequestEnded"),
            EditorEvent::RedrawViewports => write!(f, "RedrawViewports"),
            EditorEvent::UpdateProgramView { handle, .. } => write!(f, "UpdateProgramView handle={handle}"),
            EditorEvent::AssetTree(tree) => write!(f, "AssetTree assets={}", tree.all_assets.len()),
            EditorEvent::GraphView { handle, .. } => write!(f, "GraphView handle={handle}"),
            EditorEvent::ViewportResized { width, height } => write!(f, "ViewportResized {width}x{height}"),
            EditorEvent::TimelineView(timeline) => write!(
                f,
                "TimelineView lanes={} blocks={}",
                timeline.lanes.len(),
                timeline.lanes.iter().map(|lane| lane.blocks.len()).sum::<usize>()
            ),
            EditorEvent::MasterScriptState { path: Some(path) } => {
                write!(f, "MasterScriptState loaded={}", path.display())
            }
            EditorEvent::MasterScriptState { path: None } => write!(f, "MasterScriptState none"),
            EditorEvent::Log { channel, message } => write!(f, "Log [{channel}] {message}"),
            EditorEvent::Assertion(request) => write!(f, "Assertion {}:{}", request.file, request.line),
        }
    }
}

/// Engine-side end of the event channel. Sends never block; a closed UI is logged once per
/// event at debug level and otherwise ignored.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<EditorEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::Sender<EditorEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::Receiver<EditorEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: EditorEvent) {
        if let Err(mpsc::SendError(event)) = self.tx.send(event) {
            log::debug!("[engine] dropped event, editor gone: {event}");
        }
    }

    pub fn log(&self, channel: LogChannel, message: impl Into<String>) {
        let message = message.into();
        log::log!(target: "pegasus::engine", channel.level(), "[{channel}] {message}");
        self.send(EditorEvent::Log { channel, message });
    }
}
