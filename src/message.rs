//! Requests posted from the UI thread to the engine thread, one enum per controller.

use std::path::PathBuf;

use crate::asset_lib::AssetType;
use crate::handle::AssetInstanceHandle;
use crate::source_code::ShaderStage;
use crate::throttle::CompileTicket;
use crate::timeline::TimelineParameter;

/// The dock a request came from; responses that concern only the requester carry it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dock {
    CodeEditor,
    ProgramEditor,
    AssetLibrary,
    Timeline,
    Shell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetIoMessage {
    OpenAsset { path: PathBuf },
    CloseAsset { handle: AssetInstanceHandle },
    SaveAsset { handle: AssetInstanceHandle },
    ReloadFromAsset { handle: AssetInstanceHandle },
    NewAsset { path: PathBuf, asset_type: AssetType },
    QueryStartViewAssetTree,
    QueryRefreshViewAssetTree,
    QueryStopViewAssetTree,
}

#[derive(Debug)]
pub enum SourceIoMessage {
    SetSource { handle: AssetInstanceHandle, text: String },
    CompileSource { handle: AssetInstanceHandle },
    SetSourceAndCompile { handle: AssetInstanceHandle, text: String, ticket: Option<CompileTicket> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramIoMessage {
    RemoveShader { program: AssetInstanceHandle, stage: ShaderStage },
    ModifyShader { program: AssetInstanceHandle, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIoMessage {
    ViewGraph { handle: AssetInstanceHandle },
}

/// Binds timeline scripts to the engine timeline and edits its properties. Blocks are named by
/// guid.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineIoMessage {
    AddLane,
    AddBlock { lane: usize, name: String, class_name: String, beat: u32, duration: u32 },
    SetBlockScript { block: u32, path: PathBuf },
    ClearBlockScript { block: u32 },
    SetMasterScript { path: PathBuf },
    ClearMasterScript,
    SetParameter(TimelineParameter),
    QueryTimeline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowIoMessage {
    ResizeViewport { width: u32, height: u32 },
    Redraw,
}

#[derive(Debug)]
pub enum EditorRequest {
    Asset(Dock, AssetIoMessage),
    Source(Dock, SourceIoMessage),
    Program(Dock, ProgramIoMessage),
    Graph(Dock, GraphIoMessage),
    Timeline(Dock, TimelineIoMessage),
    Window(WindowIoMessage),
    Shutdown,
}

impl EditorRequest {
    pub fn label(&self) -> &'static str {
        match self {
            EditorRequest::Asset(_, msg) => match msg {
                AssetIoMessage::OpenAsset { .. } => "open_asset",
                AssetIoMessage::CloseAsset { .. } => "close_asset",
                AssetIoMessage::SaveAsset { .. } => "save_asset",
                AssetIoMessage::ReloadFromAsset { .. } => "reload_from_asset",
                AssetIoMessage::NewAsset { .. } => "new_asset",
                AssetIoMessage::QueryStartViewAssetTree => "query_start_view_asset_tree",
                AssetIoMessage::QueryRefreshViewAssetTree => "query_refresh_view_asset_tree",
                AssetIoMessage::QueryStopViewAssetTree => "query_stop_view_asset_tree",
            },
            EditorRequest::Source(_, msg) => match msg {
                SourceIoMessage::SetSource { .. } => "set_source",
                SourceIoMessage::CompileSource { .. } => "compile_source",
                SourceIoMessage::SetSourceAndCompile { .. } => "set_source_and_compile",
            },
            EditorRequest::Program(_, msg) => match msg {
                ProgramIoMessage::RemoveShader { .. } => "remove_shader",
                ProgramIoMessage::ModifyShader { .. } => "modify_shader",
            },
            EditorRequest::Graph(_, GraphIoMessage::ViewGraph { .. }) => "view_graph",
            EditorRequest::Timeline(_, msg) => match msg {
                TimelineIoMessage::AddLane => "add_lane",
                TimelineIoMessage::AddBlock { .. } => "add_block",
                TimelineIoMessage::SetBlockScript { .. } => "set_block_script",
                TimelineIoMessage::ClearBlockScript { .. } => "clear_block_script",
                TimelineIoMessage::SetMasterScript { .. } => "set_master_script",
                TimelineIoMessage::ClearMasterScript => "clear_master_script",
                TimelineIoMessage::SetParameter(_) => "set_parameter",
                TimelineIoMessage::QueryTimeline => "query_timeline",
            },
            EditorRequest::Window(WindowIoMessage::ResizeViewport { .. }) => "resize_viewport",
            EditorRequest::Window(WindowIoMessage::Redraw) => "redraw",
            EditorRequest::Shutdown => "shutdown",
        }
    }
}
