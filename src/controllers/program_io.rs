use super::{ensure_live, ControllerContext, MessageController};
use crate::console::LogChannel;
use crate::events::EditorEvent;
use crate::message::{Dock, ProgramIoMessage};

#[derive(Debug, Default)]
pub struct ProgramIoController;

impl MessageController for ProgramIoController {
    type Message = ProgramIoMessage;

    fn execute(&mut self, ctx: &mut ControllerContext<'_>, _sender: Dock, message: ProgramIoMessage) {
        let runtime = &mut *ctx.runtime;
        match message {
            ProgramIoMessage::RemoveShader { program, stage } => {
                if !ensure_live(runtime, program, "remove shader") {
                    return;
                }
                match runtime.remove_shader(program, stage) {
                    Some(true) => runtime.announce_program_update(program),
                    Some(false) => {
                        runtime.log(LogChannel::Warning, format!("{program} has no {} stage", stage.label()))
                    }
                    None => runtime.log(LogChannel::Warning, format!("{program} is not a program")),
                }
            }
            ProgramIoMessage::ModifyShader { program, path } => {
                if !ensure_live(runtime, program, "modify shader") {
                    return;
                }
                match runtime.modify_shader(program, &path) {
                    Ok(true) => runtime.announce_program_update(program),
                    Ok(false) => runtime.log(LogChannel::Warning, format!("{program} is not a program")),
                    Err(err) => {
                        let message = format!("could not set {} on {program}: {err}", path.display());
                        runtime.log(LogChannel::Error, message.clone());
                        runtime.events().send(EditorEvent::ErrorPopup { message });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{drain, runtime};
    use crate::source_code::ShaderStage;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    #[test]
    fn modify_then_remove_updates_program_view() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("p.pas"), r#"{ "name": "p" }"#).expect("write");
        fs::write(dir.path().join("a.vs"), "void main() {}").expect("write");
        fs::write(dir.path().join("a.ps"), "void main() {}").expect("write");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let (program, _) = runtime.open_asset(Path::new("p.pas")).expect("open");
        drain(&rx);

        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        let mut controller = ProgramIoController;
        controller.execute(&mut ctx, Dock::ProgramEditor, ProgramIoMessage::ModifyShader { program, path: PathBuf::from("a.vs") });
        controller.execute(&mut ctx, Dock::ProgramEditor, ProgramIoMessage::ModifyShader { program, path: PathBuf::from("a.ps") });
        assert_eq!(
            drain(&rx),
            vec![
                "Linking handle=#0 kind=IncompleteStages",
                "UpdateProgramView handle=#0",
                "Linking handle=#0 kind=LinkingSuccess",
                "UpdateProgramView handle=#0",
            ]
        );

        controller.execute(&mut ctx, Dock::ProgramEditor, ProgramIoMessage::RemoveShader { program, stage: ShaderStage::Vertex });
        controller.execute(&mut ctx, Dock::ProgramEditor, ProgramIoMessage::RemoveShader { program, stage: ShaderStage::Vertex });
        assert_eq!(drain(&rx), vec!["Linking handle=#0 kind=IncompleteStages", "UpdateProgramView handle=#0"]);
    }
}
