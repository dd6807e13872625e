use pegasus_editor::application::ApplicationSource;
use pegasus_editor::assertion::{AssertionChoice, AssertionRequest};
use pegasus_editor::console::LogChannel;
use pegasus_editor::editor::Editor;
use pegasus_editor::engine_thread::{EngineOptions, EngineThread};
use pegasus_editor::events::EditorEvent;
use pegasus_editor::settings::Settings;
use pegasus_editor::timeline::TimelineParameter;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

const WAIT: Duration = Duration::from_secs(5);

fn timeline_view(editor: &mut Editor) {
    assert!(editor.pump_until(WAIT, |event| matches!(event, EditorEvent::TimelineView(_))));
}

#[test]
fn timeline_scripts_and_tempo_round_trip_through_the_engine() {
    let dir = tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("scripts")).expect("mkdir");
    fs::write(dir.path().join("scripts/intro.bs"), "fade in\n").expect("write script");
    fs::write(dir.path().join("scripts/master.bs"), "cue all\n").expect("write script");
    fs::write(dir.path().join("a.ps"), "void main() {}").expect("write shader");
    let (mut engine, link) = EngineThread::spawn(EngineOptions {
        asset_root: dir.path().to_path_buf(),
        application: ApplicationSource::Builtin,
        tick: Duration::from_millis(2),
    })
    .expect("spawn engine");
    let prompt = Box::new(|_: &AssertionRequest| AssertionChoice::Continue);
    let mut editor = Editor::new(link, Settings::default(), 256, prompt);

    assert!(editor.query_timeline());
    timeline_view(&mut editor);
    let timeline = editor.timeline().expect("timeline");
    assert_eq!(timeline.lanes.len(), 1);
    assert_eq!(timeline.beats_per_minute, 138.0);
    assert_eq!(editor.master_script(), None);

    editor.add_timeline_block(0, "intro", "Fade", 0, 8);
    timeline_view(&mut editor);
    let guid = editor.timeline().and_then(|timeline| timeline.lanes[0].blocks.first()).map(|block| block.guid);
    let guid = guid.expect("block placed");

    editor.set_block_script(guid, "./scripts/intro.bs");
    timeline_view(&mut editor);
    editor.set_block_script(guid, "a.ps");
    timeline_view(&mut editor);
    let block = editor.timeline().and_then(|timeline| timeline.block(guid)).expect("block");
    assert_eq!(block.script.as_deref(), Some(Path::new("scripts/intro.bs")));
    assert!(editor
        .visible_console()
        .iter()
        .any(|entry| entry.channel == LogChannel::Warning && entry.text.contains("cannot attach a.ps")));

    editor.set_master_script("scripts/master.bs");
    timeline_view(&mut editor);
    assert_eq!(editor.master_script(), Some(Path::new("scripts/master.bs")));

    editor.set_timeline_parameter(TimelineParameter::BeatsPerMinute(1000.0));
    timeline_view(&mut editor);
    assert_eq!(editor.timeline().map(|timeline| timeline.beats_per_minute), Some(500.0));

    editor.clear_master_script();
    timeline_view(&mut editor);
    assert_eq!(editor.master_script(), None);

    engine.shutdown();
}
