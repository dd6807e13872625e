use crate::asset_lib::IoError;
use crate::events::{EditorEvent, EventSender};
use crate::handle::AssetInstanceHandle;
use crate::program::LinkingEventKind;

/// Callbacks the engine invokes synchronously while compiling, linking or saving.
pub trait CompilerEventListener: Send {
    fn on_compilation_begin(&mut self, handle: AssetInstanceHandle);

    fn on_compilation_error(&mut self, handle: AssetInstanceHandle, row: u32, message: &str);

    fn on_compilation_end(&mut self, handle: AssetInstanceHandle, success: bool, log: &str);

    fn on_linking(&mut self, handle: AssetInstanceHandle, kind: LinkingEventKind, log: &str);

    fn on_file_operation(&mut self, handle: AssetInstanceHandle, error: Option<&IoError>);
}

/// Forwards every compiler callback to the UI as one event, in call order.
#[derive(Debug, Clone)]
pub struct EventBridge {
    events: EventSender,
}

impl EventBridge {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl CompilerEventListener for EventBridge {
    fn on_compilation_begin(&mut self, handle: AssetInstanceHandle) {
        self.events.send(EditorEvent::CompilationBegin { handle });
    }

    fn on_compilation_error(&mut self, handle: AssetInstanceHandle, row: u32, message: &str) {
        self.events.send(EditorEvent::CompilationError { handle, row, message: message.to_string() });
    }

    fn on_compilation_end(&mut self, handle: AssetInstanceHandle, success: bool, log: &str) {
        self.events.send(EditorEvent::CompilationEnd { handle, success, log: log.to_string() });
    }

    fn on_linking(&mut self, handle: AssetInstanceHandle, kind: LinkingEventKind, log: &str) {
        self.events.send(EditorEvent::Linking { handle, kind, log: log.to_string() });
    }

    fn on_file_operation(&mut self, handle: AssetInstanceHandle, error: Option<&IoError>) {
        self.events.send(EditorEvent::FileOperation { handle, error: error.cloned() });
    }
}
