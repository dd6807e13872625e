use pegasus_editor::application::ApplicationSource;
use pegasus_editor::assertion::{AssertionChoice, AssertionRequest};
use pegasus_editor::editor::Editor;
use pegasus_editor::engine_thread::{EngineOptions, EngineThread};
use pegasus_editor::events::EditorEvent;
use pegasus_editor::settings::Settings;
use pegasus_editor::shell::Shell;
use std::fs;
use std::io;
use std::time::Duration;
use tempfile::tempdir;

const SETTLE: Duration = Duration::from_secs(5);

fn script(lines: &[&str]) -> Vec<io::Result<String>> {
    lines.iter().map(|line| Ok(line.to_string())).collect()
}

#[test]
fn scripted_session_edits_saves_and_quits() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("a.ps"), "void main() {}\n").expect("write shader");
    let (mut engine, link) = EngineThread::spawn(EngineOptions {
        asset_root: dir.path().to_path_buf(),
        application: ApplicationSource::Builtin,
        tick: Duration::from_millis(2),
    })
    .expect("spawn engine");
    let prompt = Box::new(|_: &AssertionRequest| AssertionChoice::Continue);
    let mut editor = Editor::new(link, Settings::default(), 128, prompt);
    assert!(editor.pump_until(SETTLE, |event| matches!(event, EditorEvent::ApplicationLoaded { .. })));

    let mut out = Vec::new();
    Shell::new(&mut editor, SETTLE)
        .run(
            script(&[
                "open a.ps",
                "edit 0 void main() {",
                "show 0",
                "tabs",
                "quit",
                "bogus",
                "save 0",
                "tabs",
                "quit",
                "show 0",
            ]),
            &mut out,
        )
        .expect("shell run");
    let out = String::from_utf8(out).expect("utf8 output");

    assert!(out.contains("!   1 | void main() {"), "{out}");
    assert!(out.contains("line 1: unclosed '{'"), "{out}");
    assert!(out.contains("> #0 a.ps*"), "{out}");
    assert!(out.contains("1 object(s) have unsaved changes"), "{out}");
    assert!(out.contains("error: unknown command 'bogus'"), "{out}");
    assert!(out.contains("> #0 a.ps\n"), "{out}");
    // Nothing runs after a successful quit.
    assert_eq!(out.matches("| void main() {").count(), 1, "{out}");

    assert_eq!(fs::read_to_string(dir.path().join("a.ps")).expect("read"), "void main() {");
    assert!(!editor.is_engine_running());
    engine.shutdown();
}

#[test]
fn tree_command_lists_assets_by_category() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("a.vs"), "").expect("write");
    fs::write(dir.path().join("noise.tex"), [0u8; 4]).expect("write");
    let (_engine, link) = EngineThread::spawn(EngineOptions {
        asset_root: dir.path().to_path_buf(),
        application: ApplicationSource::Builtin,
        tick: Duration::from_millis(2),
    })
    .expect("spawn engine");
    let prompt = Box::new(|_: &AssertionRequest| AssertionChoice::Continue);
    let mut editor = Editor::new(link, Settings::default(), 128, prompt);

    let mut out = Vec::new();
    Shell::new(&mut editor, SETTLE)
        .run(script(&["open a.vs", "tree", "new noise2.tex", "untree"]), &mut out)
        .expect("shell run");
    let out = String::from_utf8(out).expect("utf8 output");

    assert!(out.contains("Shaders\n  a.vs (open)\n"), "{out}");
    assert!(out.contains("Textures\n  noise.tex\n"), "{out}");
    assert!(out.contains("error: Textures assets cannot be created in the editor"), "{out}");
    assert!(!dir.path().join("noise2.tex").exists());
}
