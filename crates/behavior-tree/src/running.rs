//! Cross-tick bookkeeping of what is currently executing.
//!
//! [`RunningStack`] keeps the live root-to-node path of the trace in progress,
//! plus two snapshot buffers holding the path to the tracked running action:
//! one for the tick in progress and one for the previous tick. The buffers are
//! swapped, never copied, when a tick begins. Comparing the previous snapshot
//! with the live path tells which nodes were abandoned when another action
//! takes over.
//!
//! [`RunningActions`] is the registry of actions that returned `Running` and may
//! be driven again outside the normal top-down tick.

use crate::behavior::NodeId;

#[derive(Debug, Clone)]
pub struct RunningStack {
    /// Live path; `path[..len]` is root to the node being traced.
    path: Vec<NodeId>,
    /// Path to the action tracked as running during this tick.
    current: Vec<NodeId>,
    /// Path to the action tracked as running at the end of the previous tick.
    previous: Vec<NodeId>,
}

impl RunningStack {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            path: Vec::with_capacity(capacity),
            current: Vec::with_capacity(capacity),
            previous: Vec::with_capacity(capacity),
        }
    }

    /// Swaps the snapshot buffers and empties the live path.
    pub(crate) fn begin(&mut self) {
        core::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
        self.path.clear();
    }

    /// Forgets every recorded path.
    pub(crate) fn clear(&mut self) {
        self.path.clear();
        self.current.clear();
        self.previous.clear();
    }

    pub(crate) fn push(&mut self, id: NodeId) {
        self.path.push(id);
    }

    pub(crate) fn pop(&mut self) {
        self.path.pop();
    }

    /// Makes `action` the tracked running action and snapshots the live path.
    ///
    /// Returns the position where the previous tick's running path diverges
    /// from the live path when `action` replaces a different action, `None`
    /// when no cleanup is needed.
    pub(crate) fn track(&mut self, action: NodeId) -> Option<usize> {
        if self.current.last() == Some(&action) {
            return None;
        }
        let replaced = self.previous.last().is_some_and(|&prev| prev != action);
        let divergence = replaced.then(|| self.divergence());

        self.current.clear();
        self.current.extend_from_slice(&self.path);
        divergence
    }

    /// Length of the common prefix of the previous running path and the live path.
    fn divergence(&self) -> usize {
        self.previous
            .iter()
            .zip(&self.path)
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Root-to-node path of the trace in progress.
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    /// Running path recorded during the current (or just finished) tick.
    pub fn current(&self) -> &[NodeId] {
        &self.current
    }

    /// Running path recorded during the tick before.
    pub fn previous(&self) -> &[NodeId] {
        &self.previous
    }

    /// The action tracked as running, if any.
    pub fn running_action(&self) -> Option<NodeId> {
        self.current.last().copied()
    }
}

/// Ordered set of actions whose last result was `Running`.
#[derive(Debug, Clone, Default)]
pub struct RunningActions {
    actions: Vec<NodeId>,
}

impl RunningActions {
    pub(crate) fn insert(&mut self, id: NodeId) {
        if !self.actions.contains(&id) {
            self.actions.push(id);
        }
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> bool {
        match self.actions.iter().position(|&a| a == id) {
            Some(pos) => {
                self.actions.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.actions.contains(&id)
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
