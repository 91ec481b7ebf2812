//! Bottom-up tree assembly.
//!
//! Children are created first and referred to by the [`NodeId`] the builder
//! hands back; parents are created last. [`TreeBuilder::build`] checks that the
//! ids form a strict tree under the chosen root.
//!
//! ```
//! use behavior_tree::{AccessLimitRegistry, BehaviorResult, Parameters, PriorityType, TreeBuilder};
//!
//! struct Guard {
//!     sees_player: bool,
//! }
//!
//! let mut builder = TreeBuilder::new();
//! let sees = builder.condition("SeesPlayer", |g: &Guard, _: &Parameters| Ok(g.sees_player));
//! let attack = builder.action("Attack", |_: &mut Guard, _: &Parameters| Ok(BehaviorResult::Running));
//! let engage = builder.sequence("Engage", [sees, attack]);
//! let idle = builder.action("Idle", |_: &mut Guard, _: &Parameters| Ok(BehaviorResult::Success));
//! let root = builder.priority("Root", PriorityType::HighestPriority, [engage, idle]);
//! let mut tree = builder.build(root).unwrap();
//!
//! let mut guard = Guard { sees_player: true };
//! let mut limits = AccessLimitRegistry::new();
//! assert_eq!(tree.force_update(&mut guard, &mut limits, 0.0), Ok(BehaviorResult::Running));
//! ```

use std::sync::Arc;

use crate::behavior::{Behavior, NodeId};
use crate::composite::{Composite, ConcurrentPolicy, LoopCount, PriorityType};
use crate::config::TreeConfig;
use crate::decorator::Decorator;
use crate::error::{BuildError, HandlerResult};
use crate::leaf::{Action, Condition};
use crate::parameters::Parameters;
use crate::status::BehaviorResult;
use crate::tree::BehaviorTree;

pub struct TreeBuilder<C> {
    nodes: Vec<Behavior<C>>,
}

impl<C> Default for TreeBuilder<C> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<C> TreeBuilder<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fully configured node and returns its id.
    pub fn add(&mut self, behavior: Behavior<C>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(behavior);
        id
    }

    pub fn action<F>(&mut self, name: impl Into<String>, handler: F) -> NodeId
    where
        F: FnMut(&mut C, &Parameters) -> HandlerResult<BehaviorResult> + Send + 'static,
    {
        self.add(Behavior::new(name, Action::new(handler)))
    }

    pub fn condition<F>(&mut self, name: impl Into<String>, handler: F) -> NodeId
    where
        F: FnMut(&C, &Parameters) -> HandlerResult<bool> + Send + 'static,
    {
        self.add(Behavior::new(name, Condition::new(handler)))
    }

    pub fn decorator(&mut self, name: impl Into<String>, decorator: Decorator<C>) -> NodeId {
        self.add(Behavior::new(name, decorator))
    }

    /// Wraps `child` behind the access limit registered under `key`.
    pub fn access_limit(&mut self, name: impl Into<String>, key: impl Into<Arc<str>>, child: NodeId) -> NodeId {
        self.decorator(name, Decorator::access_limit(key, child))
    }

    pub fn sequence(&mut self, name: impl Into<String>, children: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.add(Behavior::new(name, Composite::sequence(children)))
    }

    pub fn priority(
        &mut self,
        name: impl Into<String>,
        priority: PriorityType,
        children: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        self.add(Behavior::new(name, Composite::priority(priority, children)))
    }

    pub fn random(&mut self, name: impl Into<String>, children: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.add(Behavior::new(name, Composite::random(children)))
    }

    pub fn concurrent(
        &mut self,
        name: impl Into<String>,
        policy: ConcurrentPolicy,
        children: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        self.add(Behavior::new(name, Composite::concurrent(policy, children)))
    }

    pub fn repeat(
        &mut self,
        name: impl Into<String>,
        count: impl Into<LoopCount>,
        children: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        self.add(Behavior::new(name, Composite::repeat(count, children)))
    }

    /// Gives access to a node added earlier, e.g. to change its weight.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Behavior<C>> {
        self.nodes.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Builds a tree rooted at `root` with the default configuration.
    pub fn build(self, root: NodeId) -> Result<BehaviorTree<C>, BuildError> {
        self.build_with_config(root, TreeConfig::default())
    }

    pub fn build_with_config(self, root: NodeId, config: TreeConfig) -> Result<BehaviorTree<C>, BuildError> {
        config.validate()?;
        self.check_structure(root)?;
        Ok(BehaviorTree::new(self.nodes, root, config))
    }

    /// Every id known, one parent per node, the root parentless, every node
    /// reachable from the root.
    fn check_structure(&self, root: NodeId) -> Result<(), BuildError> {
        let len = self.nodes.len();
        if root.index() >= len {
            return Err(BuildError::UnknownNode(root));
        }

        let mut parents: Vec<Option<NodeId>> = vec![None; len];
        for (index, node) in self.nodes.iter().enumerate() {
            let parent = NodeId::new(index);
            for &child in node.children() {
                let Some(slot) = parents.get_mut(child.index()) else {
                    return Err(BuildError::UnknownNode(child));
                };
                if let Some(first) = *slot {
                    return Err(BuildError::MultipleParents {
                        child,
                        first,
                        second: parent,
                    });
                }
                *slot = Some(parent);
            }
        }
        if let Some(parent) = parents[root.index()] {
            return Err(BuildError::RootHasParent { root, parent });
        }

        let mut reached = vec![false; len];
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            reached[id.index()] = true;
            pending.extend_from_slice(self.nodes[id.index()].children());
        }
        match reached.iter().position(|&r| !r) {
            Some(index) => Err(BuildError::Unreachable(NodeId::new(index))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    struct Ctx;

    fn noop(builder: &mut TreeBuilder<Ctx>, name: &str) -> NodeId {
        builder.action(name, |_: &mut Ctx, _: &Parameters| Ok(BehaviorResult::Success))
    }

    #[test]
    fn builds_valid_tree() {
        let mut builder = TreeBuilder::new();
        let a = noop(&mut builder, "A");
        let b = noop(&mut builder, "B");
        let root = builder.sequence("Root", [a, b]);
        let tree = builder.build(root).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.root(), root);
        assert_eq!(tree.find("B"), Some(b));
    }

    #[test]
    fn rejects_shared_child() {
        let mut builder = TreeBuilder::new();
        let a = noop(&mut builder, "A");
        let left = builder.sequence("Left", [a]);
        let right = builder.sequence("Right", [a]);
        let root = builder.sequence("Root", [left, right]);
        assert_eq!(
            builder.build(root).err(),
            Some(BuildError::MultipleParents {
                child: a,
                first: left,
                second: right,
            })
        );
    }

    #[test]
    fn rejects_orphans_and_unknown_ids() {
        let mut builder = TreeBuilder::new();
        let a = noop(&mut builder, "A");
        let orphan = noop(&mut builder, "Orphan");
        let root = builder.sequence("Root", [a]);
        assert_eq!(builder.build(root).err(), Some(BuildError::Unreachable(orphan)));

        let mut builder = TreeBuilder::<Ctx>::new();
        let ghost = NodeId::new(7);
        let root = builder.sequence("Root", [ghost]);
        assert_eq!(builder.build(root).err(), Some(BuildError::UnknownNode(ghost)));
    }

    #[test]
    fn rejects_root_with_parent() {
        let mut builder = TreeBuilder::new();
        let a = noop(&mut builder, "A");
        let parent = builder.sequence("Root", [a]);
        assert_eq!(
            builder.build(a).err(),
            Some(BuildError::RootHasParent { root: a, parent })
        );
    }

    #[test]
    fn rejects_invalid_config() {
        let mut builder = TreeBuilder::new();
        let root = noop(&mut builder, "A");
        let config = TreeConfig::default().with_max_sequence_length(0);
        assert_eq!(
            builder.build_with_config(root, config).err(),
            Some(BuildError::Config(ConfigError::EmptySequence))
        );
    }
}
