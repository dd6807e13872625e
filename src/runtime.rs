//! Engine-side object model: the asset library, the table of open runtime objects, and the
//! compiler hooks. Lives on the engine thread only.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::asset_lib::{Asset, AssetContents, AssetLibrary, AssetType, IoError};
use crate::asset_tree::{AssetTreeWatcher, AssetViewTree};
use crate::assertion::{AssertionBridge, AssertionChoice};
use crate::compiler_events::{CompilerEventListener, EventBridge};
use crate::console::LogChannel;
use crate::events::{EditorEvent, EventSender, ObjectState};
use crate::graph::GraphNode;
use crate::handle::AssetInstanceHandle;
use crate::handle_map::HandleMap;
use crate::program::{LinkingEventKind, Program, ProgramDescriptor};
use crate::source_code::{compile, ShaderStage, SourceCode, SourceKind};
use crate::timeline::Timeline;

#[derive(Debug, Clone)]
pub enum RuntimeObject {
    Code(SourceCode),
    Program(Program),
}

/// Entry of the open-object table. Two entries are equal when they come from the same asset,
/// which is what makes reopening an asset return its existing handle.
#[derive(Debug, Clone)]
pub struct OpenObject {
    pub path: PathBuf,
    pub object: RuntimeObject,
}

impl PartialEq for OpenObject {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl OpenObject {
    pub fn display_name(&self) -> String {
        match &self.object {
            RuntimeObject::Code(code) => code.display_name(),
            RuntimeObject::Program(program) => program.display_name(),
        }
    }

    pub fn state(&self) -> ObjectState {
        match &self.object {
            RuntimeObject::Code(code) => {
                ObjectState::Code { kind: code.kind, source: code.source.clone(), policy: code.policy }
            }
            RuntimeObject::Program(program) => ObjectState::Program {
                name: program.name.clone(),
                shaders: program.descriptor().shaders,
                valid: program.valid,
            },
        }
    }
}

pub struct Runtime {
    library: AssetLibrary,
    objects: HandleMap<OpenObject>,
    events: EventSender,
    listener: Box<dyn CompilerEventListener>,
    assertions: AssertionBridge,
    tree_watcher: Option<AssetTreeWatcher>,
    timeline: Timeline,
    viewport: (u32, u32),
    frames: u64,
}

impl Runtime {
    pub fn new(library: AssetLibrary, events: EventSender) -> Self {
        let listener = Box::new(EventBridge::new(events.clone()));
        Self::with_listener(library, events, listener)
    }

    pub fn with_listener(
        library: AssetLibrary,
        events: EventSender,
        listener: Box<dyn CompilerEventListener>,
    ) -> Self {
        Self {
            library,
            objects: HandleMap::new(),
            assertions: AssertionBridge::new(events.clone()),
            events,
            listener,
            tree_watcher: None,
            timeline: Timeline::new(),
            viewport: (128, 128),
            frames: 0,
        }
    }

    pub fn library(&self) -> &AssetLibrary {
        &self.library
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    pub fn log(&self, channel: LogChannel, message: impl Into<String>) {
        self.events.log(channel, message);
    }

    /// Checks an engine-side precondition; a failure goes through the assertion rendezvous.
    pub fn check(&mut self, condition: bool, test: &str, file: &str, line: u32, message: &str) -> bool {
        if condition {
            return true;
        }
        if self.assertions.raise(test, file, line, message) == AssertionChoice::Break {
            log::error!("[engine] break requested at {file}:{line}: {message}");
        }
        false
    }

    pub fn object(&self, handle: AssetInstanceHandle) -> Option<&OpenObject> {
        self.objects.get(handle)
    }

    pub fn open_objects(&self) -> impl Iterator<Item = (AssetInstanceHandle, &OpenObject)> + '_ {
        self.objects.iter()
    }

    pub fn is_open(&self, path: &Path) -> bool {
        AssetLibrary::normalize(path).is_ok_and(|path| self.objects.find(|open| open.path == path).is_some())
    }

    /// Opens the asset at `path`. Returns the handle and whether the object was already open.
    /// `a.ps` and `./a.ps` name the same object.
    pub fn open_asset(&mut self, path: &Path) -> Result<(AssetInstanceHandle, bool), IoError> {
        let normal = AssetLibrary::normalize(path)?;
        if let Some(existing) = self.objects.find(|open| open.path == normal) {
            return Ok((existing, true));
        }
        let path = normal.as_path();
        let asset = self.library.load_asset(path)?;
        if !asset.asset_type.is_openable() {
            return Err(IoError::UnknownType(path.to_path_buf()));
        }
        let object = self.instantiate(asset)?;
        let handle = self.objects.insert(OpenObject { path: path.to_path_buf(), object });
        if matches!(self.objects[handle].object, RuntimeObject::Program(_)) {
            self.link_program(handle);
        }
        Ok((handle, false))
    }

    pub fn close(&mut self, handle: AssetInstanceHandle) -> bool {
        self.objects.remove(handle).is_some()
    }

    pub fn create_asset(&mut self, path: &Path, asset_type: AssetType) -> Result<AssetInstanceHandle, IoError> {
        if AssetType::from_path(path) != Some(asset_type) {
            return Err(IoError::UnknownType(path.to_path_buf()));
        }
        self.library.create_blank_asset(path)?;
        self.open_asset(path).map(|(handle, _)| handle)
    }

    /// Writes the object back to its asset file. Reports the outcome to the compiler listener.
    pub fn save(&mut self, handle: AssetInstanceHandle) -> Result<(), IoError> {
        let Some(open) = self.objects.get(handle) else {
            return Err(IoError::FileNotFound(PathBuf::new()));
        };
        let asset = match &open.object {
            RuntimeObject::Code(code) => Asset {
                path: open.path.clone(),
                asset_type: AssetType::from_path(&open.path).ok_or_else(|| IoError::UnknownType(open.path.clone()))?,
                contents: AssetContents::Text(code.source.clone()),
            },
            RuntimeObject::Program(program) => Asset {
                path: open.path.clone(),
                asset_type: AssetType::Program,
                contents: AssetContents::Program(program.descriptor()),
            },
        };
        let result = self.library.save_asset(&asset);
        self.listener.on_file_operation(handle, result.as_ref().err());
        result
    }

    /// Discards in-memory changes by re-reading the asset file.
    pub fn reload(&mut self, handle: AssetInstanceHandle) -> Result<ObjectState, IoError> {
        let path = match self.objects.get(handle) {
            Some(open) => open.path.clone(),
            None => return Err(IoError::FileNotFound(PathBuf::new())),
        };
        let asset = self.library.load_asset(&path)?;
        let object = self.instantiate(asset)?;
        self.objects[handle].object = object;
        if matches!(self.objects[handle].object, RuntimeObject::Program(_)) {
            self.link_program(handle);
        }
        Ok(self.objects[handle].state())
    }

    pub fn set_source(&mut self, handle: AssetInstanceHandle, text: &str) -> bool {
        match self.objects.get_mut(handle).map(|open| &mut open.object) {
            Some(RuntimeObject::Code(code)) => {
                code.source = text.to_string();
                true
            }
            _ => false,
        }
    }

    /// Compiles a source object, reporting through the compiler listener. Programs that use the
    /// same file pick up the new text and relink.
    pub fn compile(&mut self, handle: AssetInstanceHandle) -> Option<bool> {
        let Some(RuntimeObject::Code(code)) = self.objects.get_mut(handle).map(|open| &mut open.object) else {
            return None;
        };
        self.listener.on_compilation_begin(handle);
        let output = compile(&code.display_name(), &code.source);
        for diagnostic in &output.diagnostics {
            self.listener.on_compilation_error(handle, diagnostic.row, &diagnostic.message);
        }
        code.valid = output.success();
        self.listener.on_compilation_end(handle, output.success(), &output.log);
        let (path, source, kind) = (code.path.clone(), code.source.clone(), code.kind);
        self.events.log(kind.log_channel(), output.log.clone());

        if matches!(kind, SourceKind::Shader(_)) {
            let dependents: Vec<AssetInstanceHandle> = self
                .objects
                .iter()
                .filter(|(_, open)| match &open.object {
                    RuntimeObject::Program(program) => program.shaders().iter().any(|shader| shader.path == path),
                    RuntimeObject::Code(_) => false,
                })
                .map(|(handle, _)| handle)
                .collect();
            for program_handle in dependents {
                if let Some(RuntimeObject::Program(program)) =
                    self.objects.get_mut(program_handle).map(|open| &mut open.object)
                {
                    let mut shader = SourceCode::new(path.clone(), kind, source.clone());
                    shader.valid = output.success();
                    program.set_shader(shader);
                }
                self.link_program(program_handle);
                self.announce_program_update(program_handle);
            }
        }
        Some(output.success())
    }

    pub fn link_program(&mut self, handle: AssetInstanceHandle) -> Option<LinkingEventKind> {
        let Some(RuntimeObject::Program(program)) = self.objects.get_mut(handle).map(|open| &mut open.object) else {
            return None;
        };
        let output = program.link();
        self.listener.on_linking(handle, output.kind, &output.log);
        Some(output.kind)
    }

    pub fn remove_shader(&mut self, handle: AssetInstanceHandle, stage: ShaderStage) -> Option<bool> {
        let Some(RuntimeObject::Program(program)) = self.objects.get_mut(handle).map(|open| &mut open.object) else {
            return None;
        };
        let removed = program.remove_shader(stage);
        if removed {
            self.link_program(handle);
        }
        Some(removed)
    }

    /// Loads the shader at `path` and installs it in its stage slot of the program.
    pub fn modify_shader(&mut self, handle: AssetInstanceHandle, path: &Path) -> Result<bool, IoError> {
        if !matches!(self.objects.get(handle).map(|open| &open.object), Some(RuntimeObject::Program(_))) {
            return Ok(false);
        }
        let asset = self.library.load_asset(path)?;
        let AssetType::Shader(stage) = asset.asset_type else {
            return Err(IoError::UnknownType(path.to_path_buf()));
        };
        let AssetContents::Text(source) = asset.contents else {
            return Err(IoError::UnknownType(path.to_path_buf()));
        };
        if let Some(RuntimeObject::Program(program)) = self.objects.get_mut(handle).map(|open| &mut open.object) {
            program.set_shader(SourceCode::new(asset.path, SourceKind::Shader(stage), source));
        }
        self.link_program(handle);
        Ok(true)
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    /// Checks that `path` is a readable timeline script. Returns its library path.
    pub fn timeline_script(&self, path: &Path) -> Result<PathBuf, IoError> {
        let asset = self.library.load_asset(path)?;
        if asset.asset_type != AssetType::TimelineScript {
            return Err(IoError::UnknownType(asset.path));
        }
        Ok(asset.path)
    }

    /// Pushes the current state of a program to its views.
    pub fn announce_program_update(&self, handle: AssetInstanceHandle) {
        if let Some(open) = self.objects.get(handle) {
            self.events.send(EditorEvent::UpdateProgramView { handle, state: open.state() });
        }
    }

    pub fn graph(&self, handle: AssetInstanceHandle) -> Option<GraphNode> {
        match &self.objects.get(handle)?.object {
            RuntimeObject::Program(program) => Some(GraphNode::from_program(program)),
            RuntimeObject::Code(code) => Some(GraphNode::Leaf { label: code.display_name() }),
        }
    }

    pub fn asset_tree(&self) -> Result<AssetViewTree, IoError> {
        AssetViewTree::build(&self.library, |path| self.is_open(path))
    }

    pub fn start_tree_watch(&mut self) -> Result<()> {
        if self.tree_watcher.is_none() {
            self.tree_watcher = Some(AssetTreeWatcher::new(self.library.root())?);
        }
        Ok(())
    }

    pub fn stop_tree_watch(&mut self) {
        self.tree_watcher = None;
    }

    pub fn is_watching_tree(&self) -> bool {
        self.tree_watcher.is_some()
    }

    /// Whether watched asset files changed since the last poll.
    pub fn poll_tree_changes(&mut self) -> bool {
        self.tree_watcher.as_mut().is_some_and(|watcher| !watcher.drain_changes().is_empty())
    }

    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn advance_frame(&mut self) -> u64 {
        self.frames += 1;
        self.frames
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn instantiate(&mut self, asset: Asset) -> Result<RuntimeObject, IoError> {
        let Asset { path, asset_type, contents } = asset;
        match (asset_type, contents) {
            (AssetType::Shader(stage), AssetContents::Text(text)) => {
                Ok(RuntimeObject::Code(SourceCode::new(path, SourceKind::Shader(stage), text)))
            }
            (AssetType::TimelineScript, AssetContents::Text(text)) => {
                Ok(RuntimeObject::Code(SourceCode::new(path, SourceKind::TimelineScript, text)))
            }
            (AssetType::ScriptHeader, AssetContents::Text(text)) => {
                Ok(RuntimeObject::Code(SourceCode::new(path, SourceKind::ScriptHeader, text)))
            }
            (AssetType::Program, AssetContents::Program(descriptor)) => {
                Ok(RuntimeObject::Program(self.instantiate_program(path, descriptor)))
            }
            _ => Err(IoError::UnknownType(path)),
        }
    }

    fn instantiate_program(&mut self, path: PathBuf, descriptor: ProgramDescriptor) -> Program {
        let mut program = Program::new(path, descriptor.name);
        for shader_ref in descriptor.shaders {
            match self.library.load_asset(&shader_ref.path) {
                Ok(Asset { path, contents: AssetContents::Text(text), .. }) => {
                    program.set_shader(SourceCode::new(path, SourceKind::Shader(shader_ref.stage), text))
                }
                Ok(_) => self.log(
                    LogChannel::Warning,
                    format!("{}: {} is not a shader source", program.name, shader_ref.path.display()),
                ),
                Err(err) => self.log(LogChannel::Warning, format!("{}: cannot load shader: {err}", program.name)),
            }
        }
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn runtime(root: &Path) -> (Runtime, std::sync::mpsc::Receiver<EditorEvent>) {
        let (events, rx) = EventSender::channel();
        (Runtime::new(AssetLibrary::new(root), events), rx)
    }

    #[test]
    fn reopening_returns_the_same_handle() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.ps"), "void main() {}").expect("write");
        let (mut runtime, _rx) = runtime(dir.path());
        let (first, was_open) = runtime.open_asset(Path::new("a.ps")).expect("open");
        assert!(!was_open);
        let (second, was_open) = runtime.open_asset(Path::new("a.ps")).expect("reopen");
        assert!(was_open);
        assert_eq!(first, second);
        assert!(runtime.close(first));
        assert!(!runtime.close(first));
    }

    #[test]
    fn compile_reports_diagnostics_through_listener() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.ps"), "void main() {").expect("write");
        let (mut runtime, rx) = runtime(dir.path());
        let (handle, _) = runtime.open_asset(Path::new("a.ps")).expect("open");
        assert_eq!(runtime.compile(handle), Some(false));
        let events: Vec<String> = rx.try_iter().map(|e| e.to_string()).collect();
        assert_eq!(events[0], format!("CompilationBegin handle={handle}"));
        assert!(events[1].contains("row=1 unclosed '{'"));
        assert_eq!(events[2], format!("CompilationEnd handle={handle} success=false"));
    }

    #[test]
    fn program_relinks_when_its_shader_compiles() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.vs"), "void main() {}").expect("write");
        fs::write(dir.path().join("a.ps"), "void main() {}").expect("write");
        fs::write(
            dir.path().join("p.pas"),
            r#"{ "name": "p", "shaders": [ { "stage": "vertex", "path": "a.vs" }, { "stage": "pixel", "path": "a.ps" } ] }"#,
        )
        .expect("write");
        let (mut runtime, rx) = runtime(dir.path());
        let (program, _) = runtime.open_asset(Path::new("p.pas")).expect("open program");
        let (pixel, _) = runtime.open_asset(Path::new("a.ps")).expect("open shader");
        let _ = rx.try_iter().count();

        runtime.set_source(pixel, "void main() {");
        runtime.compile(pixel);
        let relinked = rx.try_iter().any(|event| {
            matches!(event, EditorEvent::Linking { handle, kind: LinkingEventKind::ShaderCompilationFailed, .. } if handle == program)
        });
        assert!(relinked);
        match runtime.object(program).map(|open| open.state()) {
            Some(ObjectState::Program { valid, .. }) => assert!(!valid),
            other => panic!("expected program state, got {other:?}"),
        }
    }

    #[test]
    fn save_writes_current_source() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.bs"), "old").expect("write");
        let (mut runtime, rx) = runtime(dir.path());
        let (handle, _) = runtime.open_asset(Path::new("a.bs")).expect("open");
        runtime.set_source(handle, "new");
        runtime.save(handle).expect("save");
        assert_eq!(fs::read_to_string(dir.path().join("a.bs")).expect("read"), "new");
        assert!(rx.try_iter().any(|e| matches!(e, EditorEvent::FileOperation { error: None, .. })));
        runtime.set_source(handle, "scratch");
        match runtime.reload(handle).expect("reload") {
            ObjectState::Code { source, .. } => assert_eq!(source, "new"),
            other => panic!("expected code, got {other:?}"),
        }
    }

    #[test]
    fn modify_shader_rejects_non_shaders() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("p.pas"), r#"{ "name": "p" }"#).expect("write");
        fs::write(dir.path().join("s.bs"), "").expect("write");
        let (mut runtime, _rx) = runtime(dir.path());
        let (program, _) = runtime.open_asset(Path::new("p.pas")).expect("open");
        assert!(matches!(runtime.modify_shader(program, Path::new("s.bs")), Err(IoError::UnknownType(_))));
    }

    #[test]
    fn dot_prefixed_path_reuses_the_open_object() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("shaders")).expect("mkdir");
        fs::write(dir.path().join("shaders/a.ps"), "void main() {}").expect("write");
        let (mut runtime, _rx) = runtime(dir.path());
        let (first, _) = runtime.open_asset(Path::new("shaders/a.ps")).expect("open");
        let (second, was_open) = runtime.open_asset(Path::new("./shaders/./a.ps")).expect("reopen");
        assert_eq!(second, first);
        assert!(was_open);
        assert_eq!(runtime.open_objects().count(), 1);
        assert!(runtime.is_open(Path::new("./shaders/a.ps")));
        assert!(matches!(runtime.open_asset(Path::new("../a.ps")), Err(IoError::OutsideRoot(_))));
    }
}
