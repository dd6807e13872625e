use super::{ensure_live, ControllerContext, MessageController};
use crate::events::EditorEvent;
use crate::message::{Dock, GraphIoMessage};

#[derive(Debug, Default)]
pub struct GraphIoController;

impl MessageController for GraphIoController {
    type Message = GraphIoMessage;

    fn execute(&mut self, ctx: &mut ControllerContext<'_>, _sender: Dock, message: GraphIoMessage) {
        let GraphIoMessage::ViewGraph { handle } = message;
        if !ensure_live(ctx.runtime, handle, "view graph") {
            return;
        }
        if let Some(root) = ctx.runtime.graph(handle) {
            ctx.runtime.events().send(EditorEvent::GraphView { handle, root });
        }
    }
}
