use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::engine_thread::RequestSender;
use crate::events::{EditorEvent, IoResponse, ObjectState};
use crate::graph::GraphNode;
use crate::handle::AssetInstanceHandle;
use crate::message::{AssetIoMessage, Dock, EditorRequest, GraphIoMessage, ProgramIoMessage};
use crate::program::{LinkingEventKind, ProgramShaderRef};
use crate::source_code::ShaderStage;
use crate::tab_bar::{CloseOutcome, NodeFileTabBar, SavePrompt, TabSignal};

const DOCK: Dock = Dock::ProgramEditor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramView {
    pub name: String,
    pub shaders: Vec<ProgramShaderRef>,
    pub valid: bool,
    pub link_log: Option<String>,
    pub graph: Option<GraphNode>,
}

pub struct ProgramEditor {
    tabs: NodeFileTabBar,
    programs: BTreeMap<AssetInstanceHandle, ProgramView>,
    requests: RequestSender,
    dirty_signals: Vec<TabSignal>,
}

impl ProgramEditor {
    pub fn new(requests: RequestSender) -> Self {
        Self { tabs: NodeFileTabBar::new(), programs: BTreeMap::new(), requests, dirty_signals: Vec::new() }
    }

    pub fn tabs(&self) -> &NodeFileTabBar {
        &self.tabs
    }

    pub fn program(&self, handle: AssetInstanceHandle) -> Option<&ProgramView> {
        self.programs.get(&handle)
    }

    pub fn open(&mut self, handle: AssetInstanceHandle, name: &str, state: &ObjectState) -> bool {
        let ObjectState::Program { name: program_name, shaders, valid } = state else {
            return false;
        };
        if self.tabs.open_tab(handle, name) {
            self.programs.insert(
                handle,
                ProgramView {
                    name: program_name.clone(),
                    shaders: shaders.clone(),
                    valid: *valid,
                    link_log: None,
                    graph: None,
                },
            );
            self.requests.post(EditorRequest::Graph(DOCK, GraphIoMessage::ViewGraph { handle }));
        }
        self.process_signals();
        true
    }

    pub fn remove_shader(&mut self, program: AssetInstanceHandle, stage: ShaderStage) -> bool {
        self.edit(program, ProgramIoMessage::RemoveShader { program, stage })
    }

    pub fn modify_shader(&mut self, program: AssetInstanceHandle, path: PathBuf) -> bool {
        self.edit(program, ProgramIoMessage::ModifyShader { program, path })
    }

    pub fn save(&mut self, handle: AssetInstanceHandle) -> bool {
        if !self.programs.contains_key(&handle) {
            return false;
        }
        self.tabs.begin_save(handle);
        self.requests.post(EditorRequest::Asset(DOCK, AssetIoMessage::SaveAsset { handle }))
    }

    pub fn request_close(&mut self, handle: AssetInstanceHandle, prompt: &mut dyn SavePrompt) -> CloseOutcome {
        let outcome = self.tabs.request_close(handle, prompt);
        self.process_signals();
        outcome
    }

    pub fn handle_event(&mut self, event: &EditorEvent) -> bool {
        let handled = match event {
            EditorEvent::Linking { handle, kind, log } => match self.programs.get_mut(handle) {
                Some(view) => {
                    view.valid = *kind == LinkingEventKind::LinkingSuccess;
                    view.link_log = (!log.is_empty()).then(|| log.clone());
                    true
                }
                None => false,
            },
            EditorEvent::UpdateProgramView { handle, state } | EditorEvent::ObjectReloaded { handle, state } => {
                let updated = self.apply_state(*handle, state);
                if updated {
                    self.requests.post(EditorRequest::Graph(DOCK, GraphIoMessage::ViewGraph { handle: *handle }));
                }
                updated
            }
            EditorEvent::GraphView { handle, root } => match self.programs.get_mut(handle) {
                Some(view) => {
                    view.graph = Some(root.clone());
                    true
                }
                None => false,
            },
            EditorEvent::Io { sender: DOCK, handle, response, .. } => {
                match response {
                    IoResponse::SaveSuccess => self.tabs.on_save_success(*handle),
                    IoResponse::SaveError => self.tabs.on_save_error(*handle),
                    IoResponse::NewSuccess | IoResponse::NewError => {}
                }
                true
            }
            EditorEvent::ObjectClosed { handle } => {
                let known = self.tabs.contains(*handle);
                self.tabs.forget(*handle);
                self.programs.remove(handle);
                known
            }
            _ => false,
        };
        self.process_signals();
        handled
    }

    pub fn take_dirty_signals(&mut self) -> Vec<TabSignal> {
        std::mem::take(&mut self.dirty_signals)
    }

    fn edit(&mut self, program: AssetInstanceHandle, message: ProgramIoMessage) -> bool {
        if !self.programs.contains_key(&program) {
            return false;
        }
        self.tabs.mark_dirty(program);
        let posted = self.requests.post(EditorRequest::Program(DOCK, message));
        self.process_signals();
        posted
    }

    fn apply_state(&mut self, handle: AssetInstanceHandle, state: &ObjectState) -> bool {
        let (Some(view), ObjectState::Program { name, shaders, valid }) = (self.programs.get_mut(&handle), state) else {
            return false;
        };
        view.name = name.clone();
        view.shaders = shaders.clone();
        view.valid = *valid;
        true
    }

    fn process_signals(&mut self) {
        for signal in self.tabs.drain_signals() {
            match signal {
                TabSignal::DisplayObject(_) => {}
                TabSignal::RuntimeObjectRemoved(handle) => {
                    self.programs.remove(&handle);
                    self.requests.post(EditorRequest::Asset(DOCK, AssetIoMessage::CloseAsset { handle }));
                }
                TabSignal::SaveObject(handle) => {
                    self.save(handle);
                }
                TabSignal::DiscardObjectChanges(handle) => {
                    self.requests.post(EditorRequest::Asset(DOCK, AssetIoMessage::ReloadFromAsset { handle }));
                }
                TabSignal::RegisterDirtyObject(_) | TabSignal::UnregisterDirtyObject(_) => {
                    self.dirty_signals.push(signal);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_state(shaders: Vec<ProgramShaderRef>, valid: bool) -> ObjectState {
        ObjectState::Program { name: "blur".into(), shaders, valid }
    }

    #[test]
    fn edits_mark_dirty_and_refresh_graph() {
        let (requests, rx) = RequestSender::channel();
        let mut editor = ProgramEditor::new(requests);
        let handle = AssetInstanceHandle::new(5);
        editor.open(handle, "blur.pas", &program_state(Vec::new(), false));
        assert_eq!(rx.try_iter().map(|r| r.label()).collect::<Vec<_>>(), vec!["view_graph"]);

        assert!(editor.modify_shader(handle, PathBuf::from("a.vs")));
        assert!(editor.tabs().is_dirty(handle));
        assert_eq!(editor.take_dirty_signals(), vec![TabSignal::RegisterDirtyObject(handle)]);

        let shaders = vec![ProgramShaderRef { stage: ShaderStage::Vertex, path: PathBuf::from("a.vs") }];
        editor.handle_event(&EditorEvent::Linking {
            handle,
            kind: LinkingEventKind::IncompleteStages,
            log: "needs pixel".into(),
        });
        editor.handle_event(&EditorEvent::UpdateProgramView { handle, state: program_state(shaders.clone(), false) });
        assert_eq!(rx.try_iter().map(|r| r.label()).collect::<Vec<_>>(), vec!["modify_shader", "view_graph"]);

        let view = editor.program(handle).expect("view");
        assert_eq!(view.shaders, shaders);
        assert_eq!(view.link_log.as_deref(), Some("needs pixel"));
        assert!(!view.valid);

        editor.handle_event(&EditorEvent::GraphView { handle, root: GraphNode::Leaf { label: "blur".into() } });
        assert!(editor.program(handle).is_some_and(|view| view.graph.is_some()));
    }

    #[test]
    fn unknown_handles_are_ignored() {
        let (requests, rx) = RequestSender::channel();
        let mut editor = ProgramEditor::new(requests);
        let stranger = AssetInstanceHandle::new(1);
        assert!(!editor.remove_shader(stranger, ShaderStage::Pixel));
        assert!(!editor.handle_event(&EditorEvent::GraphView { handle: stranger, root: GraphNode::Leaf { label: String::new() } }));
        assert_eq!(rx.try_iter().count(), 0);
    }
}
