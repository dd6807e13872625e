use std::path::Path;

use super::{ensure_live, ControllerContext, MessageController};
use crate::asset_lib::AssetType;
use crate::console::LogChannel;
use crate::events::{EditorEvent, IoResponse};
use crate::handle::AssetInstanceHandle;
use crate::message::{AssetIoMessage, Dock};
use crate::runtime::{Runtime, RuntimeObject};
use crate::source_code::CompilationPolicy;

#[derive(Debug, Default)]
pub struct AssetIoController;

impl MessageController for AssetIoController {
    type Message = AssetIoMessage;

    fn execute(&mut self, ctx: &mut ControllerContext<'_>, sender: Dock, message: AssetIoMessage) {
        let runtime = &mut *ctx.runtime;
        match message {
            AssetIoMessage::OpenAsset { path } => open(runtime, &path),
            AssetIoMessage::CloseAsset { handle } => {
                if ensure_live(runtime, handle, "close asset") && runtime.close(handle) {
                    runtime.events().send(EditorEvent::ObjectClosed { handle });
                    runtime.events().send(EditorEvent::UpdateNodeViews);
                }
            }
            AssetIoMessage::SaveAsset { handle } => {
                if ensure_live(runtime, handle, "save asset") {
                    save(runtime, sender, handle);
                }
            }
            AssetIoMessage::ReloadFromAsset { handle } => {
                if !ensure_live(runtime, handle, "reload asset") {
                    return;
                }
                match runtime.reload(handle) {
                    Ok(state) => runtime.events().send(EditorEvent::ObjectReloaded { handle, state }),
                    Err(err) => popup(runtime, format!("could not reload {handle}: {err}")),
                }
            }
            AssetIoMessage::NewAsset { path, asset_type } => create(runtime, sender, &path, asset_type),
            AssetIoMessage::QueryStartViewAssetTree => {
                if let Err(err) = runtime.start_tree_watch() {
                    runtime.log(LogChannel::Warning, format!("asset tree will not auto-refresh: {err:#}"));
                }
                send_tree(runtime);
            }
            AssetIoMessage::QueryRefreshViewAssetTree => send_tree(runtime),
            AssetIoMessage::QueryStopViewAssetTree => runtime.stop_tree_watch(),
        }
    }
}

fn open(runtime: &mut Runtime, path: &Path) {
    match runtime.open_asset(path) {
        Ok((handle, _)) => {
            announce_open(runtime, handle);
            runtime.events().send(EditorEvent::UpdateNodeViews);
        }
        Err(err) => popup(runtime, format!("could not open {}: {err}", path.display())),
    }
}

fn announce_open(runtime: &Runtime, handle: AssetInstanceHandle) {
    if let Some(open) = runtime.object(handle) {
        runtime.events().send(EditorEvent::ObjectOpened {
            handle,
            display_name: open.display_name(),
            state: open.state(),
        });
    }
}

fn save(runtime: &mut Runtime, sender: Dock, handle: AssetInstanceHandle) {
    match runtime.save(handle) {
        Ok(()) => {
            runtime.events().send(EditorEvent::Io { sender, handle, response: IoResponse::SaveSuccess, detail: None });
            let compile_on_save = matches!(
                runtime.object(handle).map(|open| &open.object),
                Some(RuntimeObject::Code(code)) if code.policy == CompilationPolicy::ForceOnSave
            );
            if compile_on_save {
                runtime.compile(handle);
                runtime.events().send(EditorEvent::RedrawViewports);
            }
        }
        Err(err) => {
            runtime.log(LogChannel::Error, format!("save {handle} failed: {err}"));
            runtime.events().send(EditorEvent::Io {
                sender,
                handle,
                response: IoResponse::SaveError,
                detail: Some(err.to_string()),
            });
        }
    }
}

fn create(runtime: &mut Runtime, sender: Dock, path: &Path, asset_type: AssetType) {
    let result = if asset_type.is_openable() {
        runtime.create_asset(path, asset_type).map_err(|err| err.to_string())
    } else {
        Err(format!("{} assets cannot be created in the editor", asset_type.label()))
    };
    match result {
        Ok(handle) => {
            runtime.events().send(EditorEvent::Io { sender, handle, response: IoResponse::NewSuccess, detail: None });
            announce_open(runtime, handle);
            runtime.events().send(EditorEvent::UpdateNodeViews);
        }
        Err(detail) => {
            runtime.log(LogChannel::Warning, format!("new asset {}: {detail}", path.display()));
            runtime.events().send(EditorEvent::Io {
                sender,
                handle: AssetInstanceHandle::INVALID,
                response: IoResponse::NewError,
                detail: Some(detail),
            });
        }
    }
}

fn send_tree(runtime: &Runtime) {
    match runtime.asset_tree() {
        Ok(tree) => runtime.events().send(EditorEvent::AssetTree(tree)),
        Err(err) => popup(runtime, format!("could not list assets: {err}")),
    }
}

fn popup(runtime: &Runtime, message: String) {
    runtime.log(LogChannel::Error, message.clone());
    runtime.events().send(EditorEvent::ErrorPopup { message });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{drain, runtime};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn run(ctx: &mut ControllerContext<'_>, message: AssetIoMessage) {
        AssetIoController.execute(ctx, Dock::CodeEditor, message);
    }

    #[test]
    fn open_then_close_emits_lifecycle_events() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.vs"), "void main() {}").expect("write");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        run(&mut ctx, AssetIoMessage::OpenAsset { path: PathBuf::from("a.vs") });
        let handle = AssetInstanceHandle::new(0);
        run(&mut ctx, AssetIoMessage::CloseAsset { handle });
        assert_eq!(
            drain(&rx),
            vec!["ObjectOpened handle=#0 name=a.vs", "UpdateNodeViews", "ObjectClosed handle=#0", "UpdateNodeViews"]
        );
    }

    #[test]
    fn missing_file_raises_error_popup() {
        let dir = tempdir().expect("tempdir");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        run(&mut ctx, AssetIoMessage::OpenAsset { path: PathBuf::from("nope.ps") });
        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("ErrorPopup could not open nope.ps"));
    }

    #[test]
    fn new_texture_is_refused_with_new_error() {
        let dir = tempdir().expect("tempdir");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        run(&mut ctx, AssetIoMessage::NewAsset { path: PathBuf::from("t.tex"), asset_type: AssetType::Texture });
        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("Io sender=CodeEditor handle=#invalid response=NewError"));
        assert!(!dir.path().join("t.tex").exists());
    }

    #[test]
    fn new_script_opens_it_and_save_compiles_on_save_policy() {
        let dir = tempdir().expect("tempdir");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        run(
            &mut ctx,
            AssetIoMessage::NewAsset { path: PathBuf::from("intro.bs"), asset_type: AssetType::TimelineScript },
        );
        assert_eq!(
            drain(&rx),
            vec![
                "Io sender=CodeEditor handle=#0 response=NewSuccess",
                "ObjectOpened handle=#0 name=intro.bs",
                "UpdateNodeViews",
            ]
        );
        let handle = AssetInstanceHandle::new(0);
        ctx.runtime.set_source(handle, "fn main() { }");
        run(&mut ctx, AssetIoMessage::SaveAsset { handle });
        let events = drain(&rx);
        assert_eq!(events[0], "FileOperation handle=#0 saved");
        assert_eq!(events[1], "Io sender=CodeEditor handle=#0 response=SaveSuccess");
        assert_eq!(events[2], "CompilationBegin handle=#0");
        assert_eq!(events.last().map(String::as_str), Some("RedrawViewports"));
        assert_eq!(fs::read_to_string(dir.path().join("intro.bs")).expect("read"), "fn main() { }");
    }

    #[test]
    fn tree_queries_list_the_library() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.ps"), "").expect("write");
        let (mut runtime, mut app, rx) = runtime(dir.path());
        let mut ctx = ControllerContext { runtime: &mut runtime, app: &mut app };
        run(&mut ctx, AssetIoMessage::QueryStartViewAssetTree);
        assert!(ctx.runtime.is_watching_tree());
        run(&mut ctx, AssetIoMessage::QueryRefreshViewAssetTree);
        run(&mut ctx, AssetIoMessage::QueryStopViewAssetTree);
        assert!(!ctx.runtime.is_watching_tree());
        assert_eq!(drain(&rx), vec!["AssetTree assets=1", "AssetTree assets=1"]);
    }
}
