use super::{ControllerContext, MessageController};
use crate::console::LogChannel;
use crate::events::EditorEvent;
use crate::message::{Dock, TimelineIoMessage};
use crate::runtime::Runtime;

/// Binds timeline scripts to blocks and to the timeline itself. Unknown blocks and unusable
/// scripts are reported on the console; the timeline view is refreshed after every message.
#[derive(Debug, Default)]
pub struct TimelineIoController;

impl MessageController for TimelineIoController {
    type Message = TimelineIoMessage;

    fn execute(&mut self, ctx: &mut ControllerContext<'_>, _sender: Dock, message: TimelineIoMessage) {
        let runtime = &mut *ctx.runtime;
        match message {
            TimelineIoMessage::AddLane => {
                let lane = runtime.timeline_mut().add_lane();
                runtime.log(LogChannel::Timeline, format!("lane {lane} added"));
            }
            TimelineIoMessage::AddBlock { lane, name, class_name, beat, duration } => {
                match runtime.timeline_mut().add_block(lane, &name, &class_name, beat, duration) {
                    Ok(guid) => runtime.log(LogChannel::Timeline, format!("block {guid} '{name}' at beat {beat}")),
                    Err(err) => runtime.log(LogChannel::Warning, format!("cannot place block '{name}': {err}")),
                }
            }
            TimelineIoMessage::SetBlockScript { block, path } => {
                let attached = runtime
                    .timeline_script(&path)
                    .map_err(|err| err.to_string())
                    .and_then(|script| {
                        runtime.timeline_mut().set_block_script(block, &script).map_err(|err| err.to_string())?;
                        Ok(script)
                    });
                match attached {
                    Ok(script) => {
                        runtime.log(LogChannel::Timeline, format!("block {block} runs {}", script.display()))
                    }
                    Err(err) => runtime.log(
                        LogChannel::Warning,
                        format!("cannot attach {} to block {block}: {err}", path.display()),
                    ),
                }
            }
            TimelineIoMessage::ClearBlockScript { block } => {
                if let Err(err) = runtime.timeline_mut().clear_block_script(block) {
                    runtime.log(LogChannel::Warning, format!("cannot clear script: {err}"));
                }
            }
            TimelineIoMessage::SetMasterScript { path } => {
                match runtime.timeline_script(&path) {
                    Ok(script) => runtime.timeline_mut().set_master_script(&script),
                    Err(err) => runtime.log(
                        LogChannel::Warning,
                        format!("cannot use {} as master script: {err}", path.display()),
                    ),
                }
                announce_master_script(runtime);
            }
            TimelineIoMessage::ClearMasterScript => {
                runtime.timeline_mut().clear_master_script();
                announce_master_script(runtime);
            }
            TimelineIoMessage::SetParameter(parameter) => match runtime.timeline_mut().set_parameter(parameter) {
                Ok(Some(corrected)) => runtime.log(LogChannel::Warning, format!("timeline value corrected to {corrected}")),
                Ok(None) => {}
                Err(err) => runtime.log(LogChannel::Warning, format!("timeline parameter rejected: {err}")),
            },
            TimelineIoMessage::QueryTimeline => announce_master_script(runtime),
        }
        runtime.events().send(EditorEvent::TimelineView(runtime.timeline().clone()));
    }
}

fn announce_master_script(runtime: &Runtime) {
    let path = runtime.timeline().master_script.clone();
    runtime.events().send(EditorEvent::MasterScriptState { path });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{drain, runtime};
    use crate::timeline::TimelineParameter;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    #[test]
    fn block_scripts_attach_only_timeline_scripts() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("intro.bs"), "").expect("write");
        fs::write(dir.path().join("a.ps"), "").expect("write");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let guid = runtime.timeline_mut().add_block(0, "intro", "Fade", 0, 4).expect("block");
        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        let mut controller = TimelineIoController;

        controller.execute(
            &mut ctx,
            Dock::Timeline,
            TimelineIoMessage::SetBlockScript { block: guid, path: PathBuf::from("./intro.bs") },
        );
        controller.execute(
            &mut ctx,
            Dock::Timeline,
            TimelineIoMessage::SetBlockScript { block: guid + 1, path: PathBuf::from("intro.bs") },
        );
        controller.execute(&mut ctx, Dock::Timeline, TimelineIoMessage::SetBlockScript { block: guid, path: PathBuf::from("a.ps") });
        assert_eq!(drain(&rx), vec!["TimelineView lanes=1 blocks=1"; 3]);
        let block = ctx.runtime.timeline().block(guid).expect("block");
        assert_eq!(block.script.as_deref(), Some(Path::new("intro.bs")));

        controller.execute(&mut ctx, Dock::Timeline, TimelineIoMessage::ClearBlockScript { block: guid });
        assert_eq!(ctx.runtime.timeline().block(guid).and_then(|block| block.script.clone()), None);
    }

    #[test]
    fn blocks_are_placed_without_overlap() {
        let dir = tempdir().expect("tempdir");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        let mut controller = TimelineIoController;
        let block = |beat| TimelineIoMessage::AddBlock {
            lane: 0,
            name: "intro".into(),
            class_name: "Fade".into(),
            beat,
            duration: 4,
        };

        controller.execute(&mut ctx, Dock::Timeline, block(0));
        controller.execute(&mut ctx, Dock::Timeline, block(2));
        controller.execute(&mut ctx, Dock::Timeline, TimelineIoMessage::AddLane);
        assert_eq!(
            drain(&rx),
            vec!["TimelineView lanes=1 blocks=1", "TimelineView lanes=1 blocks=1", "TimelineView lanes=2 blocks=1"]
        );
        assert_eq!(ctx.runtime.timeline().lanes[0].blocks[0].beat, 0);
    }

    #[test]
    fn master_script_state_is_announced() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("master.bs"), "").expect("write");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        let mut controller = TimelineIoController;

        controller.execute(&mut ctx, Dock::Timeline, TimelineIoMessage::SetMasterScript { path: PathBuf::from("missing.bs") });
        controller.execute(&mut ctx, Dock::Timeline, TimelineIoMessage::SetMasterScript { path: PathBuf::from("master.bs") });
        controller.execute(&mut ctx, Dock::Timeline, TimelineIoMessage::ClearMasterScript);
        assert_eq!(
            drain(&rx),
            vec![
                "MasterScriptState none",
                "TimelineView lanes=1 blocks=0",
                "MasterScriptState loaded=master.bs",
                "TimelineView lanes=1 blocks=0",
                "MasterScriptState none",
                "TimelineView lanes=1 blocks=0",
            ]
        );
    }

    #[test]
    fn parameters_are_applied_and_corrections_logged() {
        let dir = tempdir().expect("tempdir");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        TimelineIoController.execute(
            &mut ctx,
            Dock::Timeline,
            TimelineIoMessage::SetParameter(TimelineParameter::BeatsPerMinute(10.0)),
        );
        assert_eq!(ctx.runtime.timeline().beats_per_minute, 30.0);
        let logged: Vec<String> = rx
            .try_iter()
            .filter_map(|event| match event {
                EditorEvent::Log { channel: LogChannel::Warning, message } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(logged, vec!["timeline value corrected to 30.00 BPM"]);
    }
}
