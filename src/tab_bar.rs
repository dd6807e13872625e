//! Tab registry shared by the code and program editors.
//!
//! The bar never talks to the engine itself. It queues [`TabSignal`]s that its owner drains
//! and turns into requests, which keeps the dirty protocol testable without threads.

use std::collections::VecDeque;

use crate::handle::AssetInstanceHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabSignal {
    DisplayObject(AssetInstanceHandle),
    RuntimeObjectRemoved(AssetInstanceHandle),
    SaveObject(AssetInstanceHandle),
    DiscardObjectChanges(AssetInstanceHandle),
    RegisterDirtyObject(AssetInstanceHandle),
    UnregisterDirtyObject(AssetInstanceHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    Save,
    Discard,
    Cancel,
}

/// Asked when a dirty tab is about to close.
pub trait SavePrompt {
    fn ask(&mut self, tab_name: &str) -> SaveDecision;
}

impl<F> SavePrompt for F
where
    F: FnMut(&str) -> SaveDecision,
{
    fn ask(&mut self, tab_name: &str) -> SaveDecision {
        self(tab_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    /// A save was requested; the tab closes when it succeeds.
    SavePending,
    Cancelled,
    NotOpen,
}

#[derive(Debug, Clone)]
struct Tab {
    handle: AssetInstanceHandle,
    name: String,
    dirty: bool,
    close_after_save: bool,
    /// Bumped by every edit, dirty or not.
    edits: u64,
    /// Edit generation captured by each posted save, oldest first.
    saves_in_flight: VecDeque<u64>,
}

#[derive(Debug, Default)]
pub struct NodeFileTabBar {
    tabs: Vec<Tab>,
    current: Option<AssetInstanceHandle>,
    signals: VecDeque<TabSignal>,
}

impl NodeFileTabBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn contains(&self, handle: AssetInstanceHandle) -> bool {
        self.position(handle).is_some()
    }

    pub fn handles(&self) -> impl Iterator<Item = AssetInstanceHandle> + '_ {
        self.tabs.iter().map(|tab| tab.handle)
    }

    pub fn current(&self) -> Option<AssetInstanceHandle> {
        self.current
    }

    pub fn set_current(&mut self, handle: AssetInstanceHandle) -> bool {
        if !self.contains(handle) {
            return false;
        }
        self.current = Some(handle);
        self.signals.push_back(TabSignal::DisplayObject(handle));
        true
    }

    /// Opens a tab or focuses the existing one. Returns true when a new tab was created.
    pub fn open_tab(&mut self, handle: AssetInstanceHandle, name: impl Into<String>) -> bool {
        let created = !self.contains(handle);
        if created {
            self.tabs.push(Tab {
                handle,
                name: name.into(),
                dirty: false,
                close_after_save: false,
                edits: 0,
                saves_in_flight: VecDeque::new(),
            });
        }
        self.set_current(handle);
        created
    }

    /// Tab caption; dirty tabs carry a trailing `*`.
    pub fn tab_name(&self, handle: AssetInstanceHandle) -> Option<String> {
        let tab = self.tab(handle)?;
        Some(if tab.dirty { format!("{}*", tab.name) } else { tab.name.clone() })
    }

    pub fn is_dirty(&self, handle: AssetInstanceHandle) -> bool {
        self.tab(handle).is_some_and(|tab| tab.dirty)
    }

    pub fn dirty_handles(&self) -> impl Iterator<Item = AssetInstanceHandle> + '_ {
        self.tabs.iter().filter(|tab| tab.dirty).map(|tab| tab.handle)
    }

    /// Records an edit. Returns true on the clean to dirty transition.
    pub fn mark_dirty(&mut self, handle: AssetInstanceHandle) -> bool {
        let Some(tab) = self.tab_mut(handle) else {
            return false;
        };
        tab.edits += 1;
        if tab.dirty {
            return false;
        }
        tab.dirty = true;
        self.signals.push_back(TabSignal::RegisterDirtyObject(handle));
        true
    }

    /// Notes that a save request for the tab's current contents is being posted. Must precede
    /// the request so the matching answer can tell whether later edits were written.
    pub fn begin_save(&mut self, handle: AssetInstanceHandle) -> bool {
        let Some(tab) = self.tab_mut(handle) else {
            return false;
        };
        tab.saves_in_flight.push_back(tab.edits);
        true
    }

    /// A save finished. Edits made after it was posted keep the tab dirty and cancel a pending
    /// close.
    pub fn on_save_success(&mut self, handle: AssetInstanceHandle) {
        let Some(tab) = self.tab_mut(handle) else {
            return;
        };
        let saved = tab.saves_in_flight.pop_front().unwrap_or(tab.edits);
        if saved != tab.edits {
            tab.close_after_save = false;
            return;
        }
        let was_dirty = std::mem::replace(&mut tab.dirty, false);
        let close = std::mem::replace(&mut tab.close_after_save, false);
        if was_dirty {
            self.signals.push_back(TabSignal::UnregisterDirtyObject(handle));
        }
        if close {
            self.remove_tab(handle);
            self.signals.push_back(TabSignal::RuntimeObjectRemoved(handle));
        }
    }

    pub fn on_save_error(&mut self, handle: AssetInstanceHandle) {
        if let Some(tab) = self.tab_mut(handle) {
            tab.saves_in_flight.pop_front();
            tab.close_after_save = false;
        }
    }

    /// Drops edits of an open tab; the owner reloads the object from its asset.
    pub fn discard(&mut self, handle: AssetInstanceHandle) -> bool {
        let Some(tab) = self.tab_mut(handle) else {
            return false;
        };
        if !tab.dirty {
            return false;
        }
        tab.dirty = false;
        tab.close_after_save = false;
        self.signals.push_back(TabSignal::UnregisterDirtyObject(handle));
        self.signals.push_back(TabSignal::DiscardObjectChanges(handle));
        true
    }

    pub fn request_close(&mut self, handle: AssetInstanceHandle, prompt: &mut dyn SavePrompt) -> CloseOutcome {
        let Some(tab) = self.tab(handle) else {
            return CloseOutcome::NotOpen;
        };
        if !tab.dirty {
            self.remove_tab(handle);
            self.signals.push_back(TabSignal::RuntimeObjectRemoved(handle));
            return CloseOutcome::Closed;
        }
        match prompt.ask(&tab.name) {
            SaveDecision::Cancel => CloseOutcome::Cancelled,
            SaveDecision::Save => {
                if let Some(tab) = self.tab_mut(handle) {
                    tab.close_after_save = true;
                }
                self.signals.push_back(TabSignal::SaveObject(handle));
                CloseOutcome::SavePending
            }
            SaveDecision::Discard => {
                self.signals.push_back(TabSignal::UnregisterDirtyObject(handle));
                self.signals.push_back(TabSignal::DiscardObjectChanges(handle));
                self.remove_tab(handle);
                self.signals.push_back(TabSignal::RuntimeObjectRemoved(handle));
                CloseOutcome::Closed
            }
        }
    }

    /// The engine closed the object on its own; no prompt and no close request.
    pub fn forget(&mut self, handle: AssetInstanceHandle) {
        if self.is_dirty(handle) {
            self.signals.push_back(TabSignal::UnregisterDirtyObject(handle));
        }
        self.remove_tab(handle);
    }

    pub fn drain_signals(&mut self) -> Vec<TabSignal> {
        self.signals.drain(..).collect()
    }

    fn remove_tab(&mut self, handle: AssetInstanceHandle) {
        let Some(index) = self.position(handle) else {
            return;
        };
        self.tabs.remove(index);
        if self.current == Some(handle) {
            let next = self.tabs.get(index).or_else(|| self.tabs.last()).map(|tab| tab.handle);
            self.current = next;
            if let Some(next) = next {
                self.signals.push_back(TabSignal::DisplayObject(next));
            }
        }
    }

    fn position(&self, handle: AssetInstanceHandle) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.handle == handle)
    }

    fn tab(&self, handle: AssetInstanceHandle) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.handle == handle)
    }

    fn tab_mut(&mut self, handle: AssetInstanceHandle) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|tab| tab.handle == handle)
    }
}
