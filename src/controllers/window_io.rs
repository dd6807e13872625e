use super::{ControllerContext, MessageController};
use crate::events::EditorEvent;
use crate::message::{Dock, WindowIoMessage};

#[derive(Debug, Default)]
pub struct WindowIoController;

impl MessageController for WindowIoController {
    type Message = WindowIoMessage;

    fn execute(&mut self, ctx: &mut ControllerContext<'_>, _sender: Dock, message: WindowIoMessage) {
        match message {
            WindowIoMessage::ResizeViewport { width, height } => {
                ctx.runtime.resize_viewport(width, height);
                let (width, height) = ctx.runtime.viewport();
                ctx.app.viewport_resized(ctx.runtime, width, height);
                ctx.runtime.events().send(EditorEvent::ViewportResized { width, height });
            }
            WindowIoMessage::Redraw => ctx.runtime.events().send(EditorEvent::RedrawViewports),
        }
    }
}
