use crate::handle::AssetInstanceHandle;

pub type PaneId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Editor pane layout. A leaf shows at most one object; a split always has two or more children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitNode {
    Leaf { pane: PaneId, handle: Option<AssetInstanceHandle> },
    Split { orientation: Orientation, children: Vec<SplitNode> },
}

impl SplitNode {
    fn leaf_mut(&mut self, id: PaneId) -> Option<&mut Option<AssetInstanceHandle>> {
        match self {
            SplitNode::Leaf { pane, handle } => (*pane == id).then_some(handle),
            SplitNode::Split { children, .. } => children.iter_mut().find_map(|child| child.leaf_mut(id)),
        }
    }

    fn visit_leaves(&self, out: &mut Vec<(PaneId, Option<AssetInstanceHandle>)>) {
        match self {
            SplitNode::Leaf { pane, handle } => out.push((*pane, *handle)),
            SplitNode::Split { children, .. } => children.iter().for_each(|child| child.visit_leaves(out)),
        }
    }

    fn split_leaf(&mut self, id: PaneId, orientation: Orientation, new_pane: PaneId) -> bool {
        match self {
            SplitNode::Leaf { pane, handle } if *pane == id => {
                let original = SplitNode::Leaf { pane: *pane, handle: *handle };
                let added = SplitNode::Leaf { pane: new_pane, handle: *handle };
                *self = SplitNode::Split { orientation, children: vec![original, added] };
                true
            }
            SplitNode::Leaf { .. } => false,
            SplitNode::Split { children, .. } => {
                children.iter_mut().any(|child| child.split_leaf(id, orientation, new_pane))
            }
        }
    }

    fn remove_leaf(&mut self, id: PaneId) -> bool {
        let SplitNode::Split { children, .. } = self else {
            return false;
        };
        let direct = children.iter().position(|child| matches!(child, SplitNode::Leaf { pane, .. } if *pane == id));
        match direct {
            Some(index) => {
                children.remove(index);
            }
            None => {
                if !children.iter_mut().any(|child| child.remove_leaf(id)) {
                    return false;
                }
            }
        }
        if children.len() == 1 {
            if let Some(only) = children.pop() {
                *self = only;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct SplitView {
    root: SplitNode,
    focused: PaneId,
    next_pane: PaneId,
}

impl Default for SplitView {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitView {
    pub fn new() -> Self {
        Self { root: SplitNode::Leaf { pane: 0, handle: None }, focused: 0, next_pane: 1 }
    }

    pub fn root(&self) -> &SplitNode {
        &self.root
    }

    pub fn focused(&self) -> PaneId {
        self.focused
    }

    pub fn focus(&mut self, pane: PaneId) -> bool {
        let exists = self.root.leaf_mut(pane).is_some();
        if exists {
            self.focused = pane;
        }
        exists
    }

    /// Leaves in layout order.
    pub fn panes(&self) -> Vec<(PaneId, Option<AssetInstanceHandle>)> {
        let mut out = Vec::new();
        self.root.visit_leaves(&mut out);
        out
    }

    pub fn handle_in(&self, pane: PaneId) -> Option<AssetInstanceHandle> {
        self.panes().into_iter().find(|(id, _)| *id == pane).and_then(|(_, handle)| handle)
    }

    pub fn display(&mut self, handle: AssetInstanceHandle, pane: PaneId) -> bool {
        match self.root.leaf_mut(pane) {
            Some(slot) => {
                *slot = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Splits `pane`; the new pane shows the same object and receives focus.
    pub fn split(&mut self, pane: PaneId, orientation: Orientation) -> Option<PaneId> {
        let new_pane = self.next_pane;
        if !self.root.split_leaf(pane, orientation, new_pane) {
            return None;
        }
        self.next_pane += 1;
        self.focused = new_pane;
        Some(new_pane)
    }

    /// Closes a pane, collapsing splits left with one child. The last pane cannot be closed.
    pub fn close_pane(&mut self, pane: PaneId) -> bool {
        if !self.root.remove_leaf(pane) {
            return false;
        }
        if self.focused == pane {
            self.focused = self.panes().first().map_or(0, |(id, _)| *id);
        }
        true
    }

    pub fn find(&self, handle: AssetInstanceHandle) -> Option<PaneId> {
        self.panes().into_iter().find(|(_, shown)| *shown == Some(handle)).map(|(pane, _)| pane)
    }

    /// Clears every pane showing `handle`.
    pub fn forget(&mut self, handle: AssetInstanceHandle) {
        for (pane, shown) in self.panes() {
            if shown == Some(handle) {
                if let Some(slot) = self.root.leaf_mut(pane) {
                    *slot = None;
                }
            }
        }
    }
}
