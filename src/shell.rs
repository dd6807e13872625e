//! Line-oriented frontend over [`Editor`]. One command per line; each command posts its
//! request and waits briefly for the engine's answer before printing.

use anyhow::{anyhow, bail, Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::asset_lib::AssetType;
use crate::assertion::{AssertionChoice, AssertionPrompt, AssertionRequest};
use crate::console::LogChannel;
use crate::editor::Editor;
use crate::events::EditorEvent;
use crate::graph::GraphNode;
use crate::handle::AssetInstanceHandle;
use crate::source_code::ShaderStage;
use crate::split_view::Orientation;
use crate::tab_bar::SaveDecision;
use crate::timeline::TimelineParameter;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(PathBuf),
    New(PathBuf),
    Edit { handle: AssetInstanceHandle, text: String },
    Save(Option<AssetInstanceHandle>),
    Close { handle: AssetInstanceHandle, decision: SaveDecision },
    Discard(AssetInstanceHandle),
    Compile(AssetInstanceHandle),
    Show(AssetInstanceHandle),
    Tabs,
    Tree,
    Untree,
    Graph(AssetInstanceHandle),
    AddShader { program: AssetInstanceHandle, path: PathBuf },
    RemoveShader { program: AssetInstanceHandle, stage: ShaderStage },
    Split(Orientation),
    Console,
    Filter { channel: LogChannel, visible: bool },
    Resize { width: u32, height: u32 },
    Timeline,
    AddLane,
    AddBlock { lane: usize, name: String, class_name: String, beat: u32, duration: u32 },
    BlockScript { block: u32, path: Option<PathBuf> },
    MasterScript(Option<PathBuf>),
    Tempo(f32),
    Help,
    Quit { force: bool },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();
        let command = match name {
            "open" => Command::Open(path_arg(rest)?),
            "new" => Command::New(path_arg(rest)?),
            "edit" => {
                let (handle, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Command::Edit { handle: parse_handle(handle)?, text: text.replace("\\n", "\n") }
            }
            "save" => Command::Save(args.next().map(parse_handle).transpose()?),
            "close" => {
                let handle = parse_handle(args.next().unwrap_or_default())?;
                let decision = match args.next().unwrap_or("cancel") {
                    "save" => SaveDecision::Save,
                    "discard" => SaveDecision::Discard,
                    "cancel" => SaveDecision::Cancel,
                    other => bail!("unknown close decision '{other}' (save, discard or cancel)"),
                };
                Command::Close { handle, decision }
            }
            "discard" => Command::Discard(parse_handle(rest)?),
            "compile" => Command::Compile(parse_handle(rest)?),
            "show" => Command::Show(parse_handle(rest)?),
            "tabs" => Command::Tabs,
            "tree" => Command::Tree,
            "untree" => Command::Untree,
            "graph" => Command::Graph(parse_handle(rest)?),
            "program" => {
                let program = parse_handle(args.next().unwrap_or_default())?;
                match (args.next(), args.next()) {
                    (Some("add"), Some(path)) => Command::AddShader { program, path: PathBuf::from(path) },
                    (Some("remove"), Some(stage)) => Command::RemoveShader {
                        program,
                        stage: ShaderStage::parse(stage).ok_or_else(|| anyhow!("unknown shader stage '{stage}'"))?,
                    },
                    _ => bail!("usage: program HANDLE add PATH | program HANDLE remove STAGE"),
                }
            }
            "split" => match rest {
                "" | "h" | "horizontal" => Command::Split(Orientation::Horizontal),
                "v" | "vertical" => Command::Split(Orientation::Vertical),
                other => bail!("unknown orientation '{other}'"),
            },
            "console" => Command::Console,
            "filter" => {
                let code = args.next().unwrap_or_default();
                let channel = LogChannel::from_code(code).ok_or_else(|| anyhow!("unknown log channel '{code}'"))?;
                let visible = match args.next() {
                    Some("on") => true,
                    Some("off") => false,
                    _ => bail!("usage: filter CHANNEL on|off"),
                };
                Command::Filter { channel, visible }
            }
            "resize" => {
                let width = args.next().unwrap_or_default();
                let height = args.next().unwrap_or_default();
                Command::Resize {
                    width: width.parse().with_context(|| format!("invalid width '{width}'"))?,
                    height: height.parse().with_context(|| format!("invalid height '{height}'"))?,
                }
            }
            "timeline" => Command::Timeline,
            "lane" => Command::AddLane,
            "block" if rest.starts_with("add") => {
                let mut fields = args.skip(1);
                let (Some(name), Some(class_name), Some(beat), Some(duration)) =
                    (fields.next(), fields.next(), fields.next(), fields.next())
                else {
                    bail!("usage: block add NAME CLASS BEAT DURATION [LANE]");
                };
                Command::AddBlock {
                    lane: fields.next().unwrap_or("0").parse().context("invalid lane")?,
                    name: name.to_string(),
                    class_name: class_name.to_string(),
                    beat: beat.parse().with_context(|| format!("invalid beat '{beat}'"))?,
                    duration: duration.parse().with_context(|| format!("invalid duration '{duration}'"))?,
                }
            }
            "block" => {
                let block = args.next().unwrap_or_default();
                let block = block.parse().with_context(|| format!("invalid block '{block}'"))?;
                match (args.next(), args.next()) {
                    (Some("script"), Some(path)) => Command::BlockScript { block, path: Some(PathBuf::from(path)) },
                    (Some("clear"), None) => Command::BlockScript { block, path: None },
                    _ => bail!("usage: block GUID script PATH | block GUID clear"),
                }
            }
            "master" => match rest {
                "clear" => Command::MasterScript(None),
                _ => Command::MasterScript(Some(path_arg(rest)?)),
            },
            "bpm" => Command::Tempo(rest.parse().with_context(|| format!("invalid tempo '{rest}'"))?),
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit { force: false },
            "quit!" => Command::Quit { force: true },
            other => bail!("unknown command '{other}', try 'help'"),
        };
        Ok(command)
    }
}

fn path_arg(rest: &str) -> Result<PathBuf> {
    if rest.is_empty() {
        bail!("expected a path");
    }
    Ok(PathBuf::from(rest))
}

fn parse_handle(value: &str) -> Result<AssetInstanceHandle> {
    let digits = value.trim().trim_start_matches('#');
    let index: i32 = digits.parse().with_context(|| format!("invalid handle '{value}'"))?;
    if index < 0 {
        bail!("invalid handle '{value}'");
    }
    Ok(AssetInstanceHandle::new(index))
}

const HELP: &str = "\
open PATH | new PATH | edit H TEXT | save [H] | close H [save|discard|cancel] | discard H
compile H | show H | tabs | tree | untree | graph H | program H add PATH | program H remove STAGE
split [h|v] | console | filter CODE on|off | resize W H | quit | quit!
timeline | lane | block add NAME CLASS BEAT DURATION [LANE] | block G script PATH | block G clear
master PATH | master clear | bpm N";

pub struct Shell<'a> {
    editor: &'a mut Editor,
    settle: Duration,
}

impl<'a> Shell<'a> {
    pub fn new(editor: &'a mut Editor, settle: Duration) -> Self {
        Self { editor, settle }
    }

    /// Runs commands until `quit` or end of input.
    pub fn run<I, W>(&mut self, lines: I, out: &mut W) -> Result<()>
    where
        I: IntoIterator<Item = io::Result<String>>,
        W: Write,
    {
        for line in lines {
            let line = line.context("read command")?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(err) => {
                    writeln!(out, "error: {err}")?;
                    continue;
                }
            };
            if !self.execute(command, out)? {
                break;
            }
        }
        Ok(())
    }

    /// Returns false when the shell should stop.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<bool> {
        match command {
            Command::Open(path) | Command::New(path) if AssetType::from_path(&path).is_none() => {
                writeln!(out, "error: unknown asset type for {}", path.display())?;
            }
            Command::Open(path) => {
                self.editor.open_asset(path);
                self.settle(|event| matches!(event, EditorEvent::ObjectOpened { .. } | EditorEvent::ErrorPopup { .. }));
            }
            Command::New(path) => {
                if let Some(asset_type) = AssetType::from_path(&path) {
                    self.editor.new_asset(path, asset_type);
                    self.settle(|event| matches!(event, EditorEvent::Io { .. }));
                    self.settle(|event| matches!(event, EditorEvent::UpdateNodeViews));
                }
            }
            Command::Edit { handle, text } => {
                if !self.editor.code_editor_mut().on_text_edited(handle, &text) {
                    writeln!(out, "error: {handle} is not open in the code editor")?;
                } else {
                    self.settle(|event| matches!(event, EditorEvent::CompilationRequestEnded));
                }
            }
            Command::Save(handle) => {
                let code = self.editor.code_editor().current();
                let Some(handle) = handle.or(code) else {
                    writeln!(out, "error: nothing to save")?;
                    return self.report(out);
                };
                let posted = if self.editor.program_editor().tabs().contains(handle) {
                    self.editor.program_editor_mut().save(handle)
                } else {
                    self.editor.code_editor_mut().save(handle)
                };
                if posted {
                    self.settle(|event| matches!(event, EditorEvent::Io { .. }));
                } else {
                    writeln!(out, "error: {handle} is not open")?;
                }
            }
            Command::Close { handle, decision } => {
                let mut prompt = |_: &str| decision;
                let outcome = if self.editor.program_editor().tabs().contains(handle) {
                    self.editor.program_editor_mut().request_close(handle, &mut prompt)
                } else {
                    self.editor.code_editor_mut().request_close(handle, &mut prompt)
                };
                writeln!(out, "close {handle}: {outcome:?}")?;
                self.settle(|event| matches!(event, EditorEvent::ObjectClosed { .. } | EditorEvent::Io { .. }));
            }
            Command::Discard(handle) => {
                if self.editor.code_editor_mut().discard(handle) {
                    self.settle(|event| matches!(event, EditorEvent::ObjectReloaded { .. }));
                } else {
                    writeln!(out, "{handle} has no changes to discard")?;
                }
            }
            Command::Compile(handle) => {
                if self.editor.code_editor_mut().compile(handle) {
                    self.settle(|event| matches!(event, EditorEvent::CompilationRequestEnded));
                } else {
                    writeln!(out, "error: {handle} is not open in the code editor")?;
                }
            }
            Command::Show(handle) => self.show(handle, out)?,
            Command::Tabs => self.tabs(out)?,
            Command::Tree => {
                self.editor.start_asset_tree();
                self.settle(|event| matches!(event, EditorEvent::AssetTree(_) | EditorEvent::ErrorPopup { .. }));
                self.print_tree(out)?;
            }
            Command::Untree => {
                self.editor.stop_asset_tree();
            }
            Command::Graph(handle) => match self.editor.program_editor().program(handle).and_then(|view| view.graph.as_ref()) {
                Some(root) => print_graph(root, 0, out)?,
                None => writeln!(out, "no graph for {handle}")?,
            },
            Command::AddShader { program, path } => {
                if self.editor.program_editor_mut().modify_shader(program, path) {
                    self.settle(|event| matches!(event, EditorEvent::GraphView { .. } | EditorEvent::ErrorPopup { .. }));
                } else {
                    writeln!(out, "error: {program} is not an open program")?;
                }
            }
            Command::RemoveShader { program, stage } => {
                if self.editor.program_editor_mut().remove_shader(program, stage) {
                    self.settle(|event| matches!(event, EditorEvent::GraphView { .. }));
                } else {
                    writeln!(out, "error: {program} is not an open program")?;
                }
            }
            Command::Split(orientation) => {
                let panes = self.editor.code_editor_mut().panes_mut();
                let focused = panes.focused();
                match panes.split(focused, orientation) {
                    Some(pane) => writeln!(out, "pane {pane}")?,
                    None => writeln!(out, "error: cannot split pane {focused}")?,
                }
            }
            Command::Console => {
                self.editor.pump();
                for entry in self.editor.visible_console().iter() {
                    writeln!(out, "[{}] {}", entry.channel, entry.text)?;
                }
            }
            Command::Filter { channel, visible } => {
                self.editor.settings_mut().set_console_filter_state(channel, visible);
            }
            Command::Resize { width, height } => {
                self.editor.resize_viewport(width, height);
                self.settle(|event| matches!(event, EditorEvent::ViewportResized { .. }));
                let (width, height) = self.editor.viewport();
                writeln!(out, "viewport {width}x{height}")?;
            }
            Command::Timeline => {
                self.editor.query_timeline();
                self.settle(|event| matches!(event, EditorEvent::TimelineView(_)));
                self.print_timeline(out)?;
            }
            Command::AddLane => {
                self.editor.add_timeline_lane();
                self.settle(|event| matches!(event, EditorEvent::TimelineView(_)));
            }
            Command::AddBlock { lane, name, class_name, beat, duration } => {
                self.editor.add_timeline_block(lane, &name, &class_name, beat, duration);
                self.settle(|event| matches!(event, EditorEvent::TimelineView(_)));
            }
            Command::BlockScript { block, path } => {
                match path {
                    Some(path) => self.editor.set_block_script(block, path),
                    None => self.editor.clear_block_script(block),
                };
                self.settle(|event| matches!(event, EditorEvent::TimelineView(_)));
            }
            Command::MasterScript(path) => {
                match path {
                    Some(path) => self.editor.set_master_script(path),
                    None => self.editor.clear_master_script(),
                };
                self.settle(|event| matches!(event, EditorEvent::TimelineView(_)));
                match self.editor.master_script() {
                    Some(path) => writeln!(out, "master script {}", path.display())?,
                    None => writeln!(out, "no master script")?,
                }
            }
            Command::Tempo(bpm) => {
                self.editor.set_timeline_parameter(TimelineParameter::BeatsPerMinute(bpm));
                self.settle(|event| matches!(event, EditorEvent::TimelineView(_)));
                if let Some(timeline) = self.editor.timeline() {
                    writeln!(out, "{:.2} BPM", timeline.beats_per_minute)?;
                }
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit { force } => {
                if !force && self.editor.has_unsaved_changes() {
                    writeln!(
                        out,
                        "{} object(s) have unsaved changes; save them or use quit!",
                        self.editor.dirty_objects().len()
                    )?;
                    return self.report(out);
                }
                self.editor.shutdown_engine();
                self.settle(|event| matches!(event, EditorEvent::ApplicationStopped));
                return Ok(false);
            }
        }
        self.report(out)
    }

    fn settle(&mut self, until: impl FnMut(&EditorEvent) -> bool) {
        if !self.editor.pump_until(self.settle, until) {
            log::debug!("[shell] no answer from the engine within {:?}", self.settle);
        }
        self.editor.pump();
    }

    fn report<W: Write>(&mut self, out: &mut W) -> Result<bool> {
        for popup in self.editor.take_popups() {
            writeln!(out, "error: {popup}")?;
        }
        if let Some(status) = self.editor.code_editor().status() {
            writeln!(out, "status: {status}")?;
        }
        Ok(true)
    }

    fn show<W: Write>(&mut self, handle: AssetInstanceHandle, out: &mut W) -> Result<()> {
        if let Some(document) = self.editor.code_editor().document(handle) {
            for (index, line) in document.text.lines().enumerate() {
                let row = index as u32 + 1;
                let marker = if document.is_line_invalid(row) { "!" } else { " " };
                writeln!(out, "{marker}{row:>4} | {line}")?;
            }
            for (row, message) in document.invalid_lines() {
                writeln!(out, "line {row}: {message}")?;
            }
            return Ok(());
        }
        if let Some(view) = self.editor.program_editor().program(handle) {
            let status = if view.valid { "linked" } else { "not linked" };
            writeln!(out, "program {} ({status})", view.name)?;
            for shader in &view.shaders {
                writeln!(out, "  {:<16} {}", shader.stage.label(), shader.path.display())?;
            }
            if let Some(log) = &view.link_log {
                writeln!(out, "{log}")?;
            }
            return Ok(());
        }
        writeln!(out, "{handle} is not open")?;
        Ok(())
    }

    fn tabs<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let code = self.editor.code_editor().tabs();
        for handle in code.handles() {
            let current = if code.current() == Some(handle) { ">" } else { " " };
            writeln!(out, "{current} {handle} {}", code.tab_name(handle).unwrap_or_default())?;
        }
        let programs = self.editor.program_editor().tabs();
        for handle in programs.handles() {
            writeln!(out, "  {handle} {} [program]", programs.tab_name(handle).unwrap_or_default())?;
        }
        Ok(())
    }

    fn print_timeline<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let Some(timeline) = self.editor.timeline() else {
            writeln!(out, "timeline unavailable")?;
            return Ok(());
        };
        writeln!(
            out,
            "{:.2} BPM, {} beats, {} ticks per beat",
            timeline.beats_per_minute, timeline.num_beats, timeline.ticks_per_beat
        )?;
        match &timeline.master_script {
            Some(path) => writeln!(out, "master {}", path.display())?,
            None => writeln!(out, "master none")?,
        }
        for lane in &timeline.lanes {
            writeln!(out, "{}", lane.name)?;
            for block in &lane.blocks {
                let script = block.script.as_ref().map(|path| path.display().to_string()).unwrap_or_else(|| "-".into());
                writeln!(
                    out,
                    "  {} {} [{}] beat {}+{} {script}",
                    block.guid, block.name, block.class_name, block.beat, block.duration
                )?;
            }
        }
        Ok(())
    }

    fn print_tree<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let Some(tree) = self.editor.asset_tree() else {
            writeln!(out, "asset tree unavailable")?;
            return Ok(());
        };
        for category in &tree.type_categories {
            writeln!(out, "{}", category.display_name)?;
            for info in category.children.iter().filter_map(|index| tree.all_assets.get(*index)) {
                let open = if info.is_open { " (open)" } else { "" };
                writeln!(out, "  {}{open}", info.path.display())?;
            }
        }
        Ok(())
    }
}

fn print_graph<W: Write>(node: &GraphNode, depth: usize, out: &mut W) -> Result<()> {
    writeln!(out, "{:indent$}{}", "", node.label(), indent = depth * 2)?;
    for child in node.children() {
        print_graph(child, depth + 1, out)?;
    }
    Ok(())
}

/// Asks on stderr and reads the answer from stdin: `c`ontinue, `i`gnore, ignore `a`ll, `b`reak.
#[derive(Debug, Default)]
pub struct StdinAssertionPrompt;

impl AssertionPrompt for StdinAssertionPrompt {
    fn ask(&mut self, request: &AssertionRequest) -> AssertionChoice {
        eprintln!(
            "assertion failed at {}:{}: {} ({})\n[c]ontinue, [i]gnore, ignore [a]ll, [b]reak?",
            request.file, request.line, request.message, request.test
        );
        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return AssertionChoice::Break;
        }
        match answer.trim() {
            "i" => AssertionChoice::Ignore,
            "a" => AssertionChoice::IgnoreAll,
            "b" => AssertionChoice::Break,
            _ => AssertionChoice::Continue,
        }
    }
}

/// Reads stdin one line at a time without holding the lock between lines, so an assertion
/// prompt can read its answer in between.
pub fn stdin_lines() -> impl Iterator<Item = io::Result<String>> {
    std::iter::from_fn(|| {
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(Ok(line)),
            Err(err) => Some(Err(err)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("open shaders/a.ps").expect("open"), Command::Open(PathBuf::from("shaders/a.ps")));
        assert_eq!(
            Command::parse("edit #3 void main() {\\n}").expect("edit"),
            Command::Edit { handle: AssetInstanceHandle::new(3), text: "void main() {\n}".into() }
        );
        assert_eq!(
            Command::parse("close 2 discard").expect("close"),
            Command::Close { handle: AssetInstanceHandle::new(2), decision: SaveDecision::Discard }
        );
        assert_eq!(
            Command::parse("program 1 remove pixel").expect("program"),
            Command::RemoveShader { program: AssetInstanceHandle::new(1), stage: ShaderStage::Pixel }
        );
        assert_eq!(
            Command::parse("filter shdr off").expect("filter"),
            Command::Filter { channel: LogChannel::Shader, visible: false }
        );
        assert_eq!(Command::parse("save").expect("save"), Command::Save(None));
        assert_eq!(Command::parse("quit!").expect("quit"), Command::Quit { force: true });
        assert_eq!(
            Command::parse("block 4 script intro.bs").expect("block"),
            Command::BlockScript { block: 4, path: Some(PathBuf::from("intro.bs")) }
        );
        assert_eq!(
            Command::parse("block add intro Fade 0 4").expect("block add"),
            Command::AddBlock { lane: 0, name: "intro".into(), class_name: "Fade".into(), beat: 0, duration: 4 }
        );
        assert_eq!(Command::parse("master clear").expect("master"), Command::MasterScript(None));
        assert_eq!(Command::parse("bpm 120").expect("bpm"), Command::Tempo(120.0));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Command::parse("open").is_err());
        assert!(Command::parse("edit -1 x").is_err());
        assert!(Command::parse("close 1 maybe").is_err());
        assert!(Command::parse("resize 10").is_err());
        assert!(Command::parse("frobnicate").is_err());
        assert!(Command::parse("block x clear").is_err());
        assert!(Command::parse("block 1 script").is_err());
        assert!(Command::parse("master").is_err());
        assert!(Command::parse("block add intro Fade 0").is_err());
    }
}
