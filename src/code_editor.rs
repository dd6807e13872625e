//! Code editor dock model: tabs, shadow documents, compile throttling and diagnostics.

use std::collections::HashMap;
use std::sync::Arc;

use crate::document::ShadowDocumentState;
use crate::engine_thread::RequestSender;
use crate::events::{EditorEvent, IoResponse, ObjectState};
use crate::handle::AssetInstanceHandle;
use crate::message::{AssetIoMessage, Dock, EditorRequest, SourceIoMessage};
use crate::program::LinkingEventKind;
use crate::source_code::CompilationPolicy;
use crate::split_view::SplitView;
use crate::tab_bar::{CloseOutcome, NodeFileTabBar, SavePrompt, TabSignal};
use crate::throttle::CompilationThrottle;

const DOCK: Dock = Dock::CodeEditor;

pub struct CodeEditor {
    tabs: NodeFileTabBar,
    documents: HashMap<AssetInstanceHandle, ShadowDocumentState>,
    throttle: Arc<CompilationThrottle>,
    requests: RequestSender,
    panes: SplitView,
    status: Option<String>,
    dirty_signals: Vec<TabSignal>,
}

impl CodeEditor {
    pub fn new(requests: RequestSender) -> Self {
        Self {
            tabs: NodeFileTabBar::new(),
            documents: HashMap::new(),
            throttle: CompilationThrottle::new(),
            requests,
            panes: SplitView::new(),
            status: None,
            dirty_signals: Vec::new(),
        }
    }

    pub fn tabs(&self) -> &NodeFileTabBar {
        &self.tabs
    }

    pub fn panes(&self) -> &SplitView {
        &self.panes
    }

    pub fn panes_mut(&mut self) -> &mut SplitView {
        &mut self.panes
    }

    pub fn document(&self, handle: AssetInstanceHandle) -> Option<&ShadowDocumentState> {
        self.documents.get(&handle)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_compile_pending(&self) -> bool {
        self.throttle.is_pending()
    }

    pub fn current(&self) -> Option<AssetInstanceHandle> {
        self.tabs.current()
    }

    /// Opens a tab for an object the engine just opened, or focuses it if already open.
    pub fn open(&mut self, handle: AssetInstanceHandle, name: &str, state: &ObjectState) -> bool {
        let ObjectState::Code { kind, source, policy } = state else {
            return false;
        };
        if self.tabs.open_tab(handle, name) {
            self.documents.insert(handle, ShadowDocumentState::new(source.clone(), *kind, *policy));
        }
        self.process_signals();
        true
    }

    /// Records an edit. Under `UserDefined` the text is compiled right away unless a compile is
    /// in flight, in which case it is flushed when that compile ends.
    pub fn on_text_edited(&mut self, handle: AssetInstanceHandle, text: &str) -> bool {
        let Some(document) = self.documents.get_mut(&handle) else {
            return false;
        };
        document.text = text.to_string();
        self.tabs.mark_dirty(handle);
        if document.policy == CompilationPolicy::UserDefined {
            match self.throttle.try_acquire() {
                Some(ticket) => {
                    document.take_flush();
                    self.requests.post(EditorRequest::Source(
                        DOCK,
                        SourceIoMessage::SetSourceAndCompile { handle, text: text.to_string(), ticket: Some(ticket) },
                    ));
                }
                None => document.mark_needs_flush(),
            }
        } else {
            document.mark_needs_flush();
        }
        self.process_signals();
        true
    }

    pub fn compile(&mut self, handle: AssetInstanceHandle) -> bool {
        if !self.documents.contains_key(&handle) {
            return false;
        }
        self.requests.post(EditorRequest::Source(DOCK, SourceIoMessage::CompileSource { handle }))
    }

    pub fn save(&mut self, handle: AssetInstanceHandle) -> bool {
        let Some(document) = self.documents.get_mut(&handle) else {
            return false;
        };
        if document.needs_flush() {
            self.requests.post(EditorRequest::Source(
                DOCK,
                SourceIoMessage::SetSource { handle, text: document.text.clone() },
            ));
            if document.policy == CompilationPolicy::ForceOnSave {
                document.take_flush();
            }
        }
        self.tabs.begin_save(handle);
        self.requests.post(EditorRequest::Asset(DOCK, AssetIoMessage::SaveAsset { handle }))
    }

    pub fn save_current(&mut self) -> bool {
        self.tabs.current().is_some_and(|handle| self.save(handle))
    }

    pub fn discard(&mut self, handle: AssetInstanceHandle) -> bool {
        let discarded = self.tabs.discard(handle);
        self.process_signals();
        discarded
    }

    pub fn request_close(&mut self, handle: AssetInstanceHandle, prompt: &mut dyn SavePrompt) -> CloseOutcome {
        let outcome = self.tabs.request_close(handle, prompt);
        self.process_signals();
        outcome
    }

    /// Applies an engine event. Returns true if the event concerned this dock.
    pub fn handle_event(&mut self, event: &EditorEvent) -> bool {
        let handled = match event {
            EditorEvent::CompilationBegin { handle } => self.with_document(*handle, |doc| doc.clear_diagnostics()),
            EditorEvent::CompilationError { handle, row, message } => {
                self.with_document(*handle, |doc| doc.add_diagnostic(*row, message))
            }
            EditorEvent::CompilationEnd { handle, log, .. } => {
                let known = self.documents.contains_key(handle);
                if known {
                    self.status = Some(log.clone());
                }
                known
            }
            EditorEvent::CompilationRequestEnded => {
                self.flush_pending();
                true
            }
            EditorEvent::Linking { handle, kind, log } => {
                if !self.documents.contains_key(handle) {
                    return false;
                }
                self.status = (*kind != LinkingEventKind::LinkingSuccess).then(|| log.clone());
                true
            }
            EditorEvent::FileOperation { handle, error } => match (self.tabs.tab_name(*handle), error) {
                (None, _) => false,
                (Some(name), None) => {
                    self.status = Some(format!("saved {}", name.trim_end_matches('*')));
                    true
                }
                (Some(_), Some(err)) => {
                    self.status = Some(format!("save failed: {err}"));
                    true
                }
            },
            EditorEvent::Io { sender: DOCK, handle, response, detail } => {
                match response {
                    IoResponse::SaveSuccess => self.tabs.on_save_success(*handle),
                    IoResponse::SaveError => {
                        self.tabs.on_save_error(*handle);
                        if let Some(detail) = detail {
                            self.status = Some(detail.clone());
                        }
                    }
                    IoResponse::NewSuccess | IoResponse::NewError => {}
                }
                true
            }
            EditorEvent::ObjectReloaded { handle, state: ObjectState::Code { source, .. } } => {
                self.with_document(*handle, |doc| doc.reset(source.clone()))
            }
            EditorEvent::ObjectClosed { handle } => {
                if !self.tabs.contains(*handle) {
                    return false;
                }
                self.tabs.forget(*handle);
                self.documents.remove(handle);
                self.panes.forget(*handle);
                true
            }
            _ => false,
        };
        self.process_signals();
        handled
    }

    /// Dirty-set changes since the last call, for the owning editor context.
    pub fn take_dirty_signals(&mut self) -> Vec<TabSignal> {
        std::mem::take(&mut self.dirty_signals)
    }

    fn with_document(
        &mut self,
        handle: AssetInstanceHandle,
        update: impl FnOnce(&mut ShadowDocumentState),
    ) -> bool {
        match self.documents.get_mut(&handle) {
            Some(document) => {
                update(document);
                true
            }
            None => false,
        }
    }

    /// Sends one coalesced compile for the edits made while the previous compile was in flight,
    /// preferring the focused tab.
    fn flush_pending(&mut self) {
        let waiting = |doc: &ShadowDocumentState| doc.needs_flush() && doc.policy == CompilationPolicy::UserDefined;
        let handle = self
            .tabs
            .current()
            .filter(|handle| self.documents.get(handle).is_some_and(waiting))
            .or_else(|| self.documents.iter().find(|(_, doc)| waiting(doc)).map(|(handle, _)| *handle));
        let Some(handle) = handle else {
            return;
        };
        let Some(ticket) = self.throttle.try_acquire() else {
            return;
        };
        if let Some(document) = self.documents.get_mut(&handle) {
            document.take_flush();
            self.requests.post(EditorRequest::Source(
                DOCK,
                SourceIoMessage::SetSourceAndCompile { handle, text: document.text.clone(), ticket: Some(ticket) },
            ));
        }
    }

    fn process_signals(&mut self) {
        for signal in self.tabs.drain_signals() {
            match signal {
                TabSignal::DisplayObject(handle) => {
                    let pane = self.panes.focused();
                    self.panes.display(handle, pane);
                }
                TabSignal::RuntimeObjectRemoved(handle) => {
                    self.documents.remove(&handle);
                    self.panes.forget(handle);
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
