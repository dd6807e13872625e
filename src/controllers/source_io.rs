use super::{ensure_live, ControllerContext, MessageController};
use crate::console::LogChannel;
use crate::events::EditorEvent;
use crate::handle::AssetInstanceHandle;
use crate::message::{Dock, SourceIoMessage};
use crate::runtime::Runtime;

#[derive(Debug, Default)]
pub struct SourceIoController;

impl MessageController for SourceIoController {
    type Message = SourceIoMessage;

    fn execute(&mut self, ctx: &mut ControllerContext<'_>, _sender: Dock, message: SourceIoMessage) {
        let runtime = &mut *ctx.runtime;
        match message {
            SourceIoMessage::SetSource { handle, text } => {
                if ensure_live(runtime, handle, "set source") {
                    set_source(runtime, handle, &text);
                }
            }
            SourceIoMessage::CompileSource { handle } => {
                if ensure_live(runtime, handle, "compile source") {
                    runtime.compile(handle);
                }
                finish_compile(runtime);
            }
            SourceIoMessage::SetSourceAndCompile { handle, text, ticket } => {
                if ensure_live(runtime, handle, "set source and compile") && set_source(runtime, handle, &text) {
                    runtime.compile(handle);
                }
                // Release the editor's throttle before it hears that the request ended.
                drop(ticket);
                finish_compile(runtime);
            }
        }
    }
}

fn set_source(runtime: &mut Runtime, handle: AssetInstanceHandle, text: &str) -> bool {
    let applied = runtime.set_source(handle, text);
    if !applied {
        runtime.log(LogChannel::Warning, format!("{handle} is not source code"));
    }
    applied
}

fn finish_compile(runtime: &Runtime) {
    runtime.events().send(EditorEvent::CompilationRequestEnded);
    runtime.events().send(EditorEvent::RedrawViewports);
}
