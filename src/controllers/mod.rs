//! Engine-thread message controllers. Each one owns a single request domain and runs its
//! messages synchronously, one at a time.

mod asset_io;
mod graph_io;
mod program_io;
mod source_io;
mod timeline_io;
mod window_io;

use std::panic::Location;

use crate::application::PegasusApp;
use crate::handle::AssetInstanceHandle;
use crate::message::{Dock, EditorRequest};
use crate::runtime::Runtime;

pub use asset_io::AssetIoController;
pub use graph_io::GraphIoController;
pub use program_io::ProgramIoController;
pub use source_io::SourceIoController;
pub use timeline_io::TimelineIoController;
pub use window_io::WindowIoController;

/// What a controller may touch while executing a message.
pub struct ControllerContext<'a> {
    pub runtime: &'a mut Runtime,
    pub app: &'a mut dyn PegasusApp,
}

pub trait MessageController {
    type Message;

    fn execute(&mut self, ctx: &mut ControllerContext<'_>, sender: Dock, message: Self::Message);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

/// Routes each request to the controller of its domain.
#[derive(Debug, Default)]
pub struct Dispatcher {
    asset: AssetIoController,
    source: SourceIoController,
    program: ProgramIoController,
    graph: GraphIoController,
    timeline: TimelineIoController,
    window: WindowIoController,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, ctx: &mut ControllerContext<'_>, request: EditorRequest) -> Flow {
        log::trace!("[engine] dispatch {}", request.label());
        match request {
            EditorRequest::Asset(sender, message) => self.asset.execute(ctx, sender, message),
            EditorRequest::Source(sender, message) => self.source.execute(ctx, sender, message),
            EditorRequest::Program(sender, message) => self.program.execute(ctx, sender, message),
            EditorRequest::Graph(sender, message) => self.graph.execute(ctx, sender, message),
            EditorRequest::Timeline(sender, message) => self.timeline.execute(ctx, sender, message),
            EditorRequest::Window(message) => self.window.execute(ctx, Dock::Shell, message),
            EditorRequest::Shutdown => return Flow::Shutdown,
        }
        Flow::Continue
    }
}

/// Asserts that `handle` names an open object. The assertion location is the caller's, so
/// "ignore" in the prompt applies per call site.
#[track_caller]
pub(crate) fn ensure_live(runtime: &mut Runtime, handle: AssetInstanceHandle, operation: &str) -> bool {
    let caller = Location::caller();
    let live = runtime.object(handle).is_some();
    runtime.check(
        live,
        "handle is open",
        caller.file(),
        caller.line(),
        &format!("{operation}: handle {handle} is not open"),
    )
}
