//! Core node type.
//!
//! A tree is an arena of [`Behavior`] nodes addressed by [`NodeId`]. Composites
//! and decorators refer to their children by id, which keeps ownership flat and
//! makes node identity a plain index comparison (the running stack relies on
//! this).
//!
//! The node kind is a closed enum, [`BehaviorKind`], so every place that needs
//! to treat actions, decorators or composites differently is an exhaustive match.

use core::fmt;

use crate::composite::{Composite, CompositeType};
use crate::decorator::Decorator;
use crate::leaf::{Action, Condition};
use crate::parameters::Parameters;
use crate::status::BehaviorResult;

/// Index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the node in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declared kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BehaviorType {
    Composite,
    Condition,
    Decorator,
    Action,
}

/// Notification delivered to node listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorEvent {
    Success,
    Failure,
    Running,
    /// The node's running memory was cleared (preempted, abandoned or tree reset).
    Reset,
}

impl From<BehaviorResult> for BehaviorEvent {
    fn from(result: BehaviorResult) -> Self {
        match result {
            BehaviorResult::Success => BehaviorEvent::Success,
            BehaviorResult::Failure => BehaviorEvent::Failure,
            BehaviorResult::Running => BehaviorEvent::Running,
        }
    }
}

/// Observer attached to a node.
pub type Listener<C> = Box<dyn FnMut(&mut C, BehaviorEvent) + Send>;

/// Kind-specific payload of a node.
pub enum BehaviorKind<C> {
    Action(Action<C>),
    Condition(Condition<C>),
    Decorator(Decorator<C>),
    Composite(Composite),
}

impl<C> From<Action<C>> for BehaviorKind<C> {
    fn from(action: Action<C>) -> Self {
        BehaviorKind::Action(action)
    }
}

impl<C> From<Condition<C>> for BehaviorKind<C> {
    fn from(condition: Condition<C>) -> Self {
        BehaviorKind::Condition(condition)
    }
}

impl<C> From<Decorator<C>> for BehaviorKind<C> {
    fn from(decorator: Decorator<C>) -> Self {
        BehaviorKind::Decorator(decorator)
    }
}

impl<C> From<Composite> for BehaviorKind<C> {
    fn from(composite: Composite) -> Self {
        BehaviorKind::Composite(composite)
    }
}

/// A behavior tree node.
///
/// Holds what every kind shares: a human-readable name, the weight used by
/// random selection, the parameters of the node's slot under its parent, the
/// last result and any listeners.
pub struct Behavior<C> {
    name: String,
    weight: f32,
    pub(crate) parameters: Parameters,
    listeners: Vec<Listener<C>>,
    pub(crate) last_result: BehaviorResult,
    /// Update id of the last tick that traced this node (0 = never).
    pub(crate) last_update_id: u64,
    pub(crate) kind: BehaviorKind<C>,
}

impl<C> Behavior<C> {
    /// Creates a node.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty. Names identify nodes in traces and logs.
    pub fn new(name: impl Into<String>, kind: impl Into<BehaviorKind<C>>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "Behavior name must not be empty");
        Self {
            name,
            weight: 1.0,
            parameters: Parameters::new(),
            listeners: Vec::new(),
            last_result: BehaviorResult::Failure,
            last_update_id: 0,
            kind: kind.into(),
        }
    }

    /// Sets the selection weight (builder pattern).
    ///
    /// # Panics
    ///
    /// Panics if `weight` is not a positive finite number.
    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.set_weight(weight);
        self
    }

    /// Sets the parameters of this node's slot (builder pattern).
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Attaches a listener for success/failure/running/reset notifications.
    #[must_use]
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&mut C, BehaviorEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Changes the selection weight.
    ///
    /// # Panics
    ///
    /// Panics if `weight` is not a positive finite number.
    pub fn set_weight(&mut self, weight: f32) {
        assert!(
            weight.is_finite() && weight > 0.0,
            "Behavior weight must be positive, got {weight}"
        );
        self.weight = weight;
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Result of the most recent trace of this node.
    pub fn last_result(&self) -> BehaviorResult {
        self.last_result
    }

    /// Update id of the last tick that traced this node, 0 if never traced.
    pub fn last_update_id(&self) -> u64 {
        self.last_update_id
    }

    pub fn behavior_type(&self) -> BehaviorType {
        match self.kind {
            BehaviorKind::Action(_) => BehaviorType::Action,
            BehaviorKind::Condition(_) => BehaviorType::Condition,
            BehaviorKind::Decorator(_) => BehaviorType::Decorator,
            BehaviorKind::Composite(_) => BehaviorType::Composite,
        }
    }

    pub fn kind(&self) -> &BehaviorKind<C> {
        &self.kind
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match &self.kind {
            BehaviorKind::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    pub fn as_decorator(&self) -> Option<&Decorator<C>> {
        match &self.kind {
            BehaviorKind::Decorator(decorator) => Some(decorator),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&Action<C>> {
        match &self.kind {
            BehaviorKind::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn composite_type(&self) -> Option<CompositeType> {
        self.as_composite().map(Composite::composite_type)
    }

    /// Children in priority order. Leaves have none, decorators exactly one.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            BehaviorKind::Composite(composite) => composite.children(),
            BehaviorKind::Decorator(decorator) => core::slice::from_ref(&decorator.child),
            BehaviorKind::Action(_) | BehaviorKind::Condition(_) => &[],
        }
    }

    /// Whether the node remembers an unfinished execution it would resume.
    ///
    /// A running action is tracked by the tree's running-action registry; on
    /// the node itself only the immediate-update flag counts.
    pub(crate) fn holds_running_memory(&self) -> bool {
        match &self.kind {
            BehaviorKind::Composite(composite) => composite.holds_running_memory(),
            BehaviorKind::Decorator(decorator) => decorator.child_running,
            BehaviorKind::Action(action) => action.already_updated,
            BehaviorKind::Condition(_) => false,
        }
    }

    /// Clears all cross-tick memory of this node.
    pub(crate) fn clear_running_memory(&mut self) {
        match &mut self.kind {
            BehaviorKind::Composite(composite) => composite.clear_running_memory(),
            BehaviorKind::Decorator(decorator) => decorator.child_running = false,
            BehaviorKind::Action(action) => action.already_updated = false,
            BehaviorKind::Condition(_) => {}
        }
    }

    pub(crate) fn notify(&mut self, ctx: &mut C, event: BehaviorEvent) {
        for listener in &mut self.listeners {
            listener(ctx, event);
        }
    }
}

impl<C> fmt::Debug for Behavior<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("name", &self.name)
            .field("type", &self.behavior_type())
            .field("weight", &self.weight)
            .field("last_result", &self.last_result)
            .field("children", &self.children())
            .finish_non_exhaustive()
    }
}

impl<C> fmt::Display for Behavior<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::Composite;

    struct Ctx;

    fn leaf(name: &str) -> Behavior<Ctx> {
        Behavior::new(
            name,
            Action::new(|_: &mut Ctx, _: &Parameters| Ok(BehaviorResult::Success)),
        )
    }

    #[test]
    fn reports_declared_kind() {
        assert_eq!(leaf("Idle").behavior_type(), BehaviorType::Action);

        let seq: Behavior<Ctx> = Behavior::new(
            "Patrol",
            Composite::sequence([NodeId::new(0), NodeId::new(1)]),
        );
        assert_eq!(seq.behavior_type(), BehaviorType::Composite);
        assert_eq!(seq.children(), &[NodeId::new(0), NodeId::new(1)]);
    }

    #[test]
    #[should_panic(expected = "weight must be positive")]
    fn rejects_non_positive_weight() {
        let _ = leaf("Idle").with_weight(0.0);
    }

    #[test]
    #[should_panic(expected = "name must not be empty")]
    fn rejects_empty_name() {
        let _ = leaf("");
    }
}
