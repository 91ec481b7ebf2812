//! The trace envelope shared by every node.
//!
//! [`Executor`] bundles everything a tick needs (arena, state, access limits,
//! agent context, simulated time) so that node algorithms can recurse through
//! `trace` without juggling borrows. Each node kind adds its own `behave_*`
//! method in its module.

use crate::access::AccessLimitRegistry;
use crate::behavior::{Behavior, BehaviorEvent, BehaviorKind, BehaviorType, NodeId};
use crate::composite::CompositeType;
use crate::error::{BehaviorError, HandlerError};
use crate::running::RunningActions;
use crate::state::BehaviorState;
use crate::status::BehaviorResult;

/// Why a node's `behave` did not produce a result.
pub(crate) enum Fault {
    /// A handler raised an error. Recoverable: the node fails for this tick.
    Handler(HandlerError),
    /// Engine misconfiguration. Aborts the tick.
    Engine(BehaviorError),
}

impl From<HandlerError> for Fault {
    fn from(error: HandlerError) -> Self {
        Fault::Handler(error)
    }
}

impl From<BehaviorError> for Fault {
    fn from(error: BehaviorError) -> Self {
        Fault::Engine(error)
    }
}

pub(crate) type Behave = Result<BehaviorResult, Fault>;

pub(crate) struct Executor<'a, C> {
    pub(crate) nodes: &'a mut [Behavior<C>],
    pub(crate) state: &'a mut BehaviorState,
    pub(crate) limits: &'a mut AccessLimitRegistry,
    pub(crate) ctx: &'a mut C,
    pub(crate) now: f64,
}

impl<C> Executor<'_, C> {
    /// Traces one node: registers it in the execution sequence and running
    /// stack, runs its algorithm, degrades handler faults to `Failure` and
    /// notifies listeners.
    pub(crate) fn trace(&mut self, id: NodeId) -> Result<BehaviorResult, BehaviorError> {
        let slot = self.state.register_for_execution(id)?;
        self.state.stack.push(id);
        self.nodes[id.index()].last_update_id = self.state.update_id();

        let outcome = self.behave(id);

        let result = match outcome {
            Ok(result) => result,
            Err(Fault::Handler(error)) => {
                let name = self.nodes[id.index()].name();
                tracing::debug!("node `{}` {} faulted: {}", name, id, error);
                self.state.record_fault(id, name, error);
                BehaviorResult::Failure
            }
            Err(Fault::Engine(error)) => {
                self.nodes[id.index()].last_result = BehaviorResult::Failure;
                self.state.complete(slot, BehaviorResult::Failure);
                self.state.stack.pop();
                return Err(error);
            }
        };

        let node = &mut self.nodes[id.index()];
        node.last_result = result;
        self.state.complete(slot, result);
        node.notify(self.ctx, result.into());
        tracing::trace!("{} `{}` -> {}", id, node.name(), result);

        self.state.stack.pop();
        Ok(result)
    }

    fn behave(&mut self, id: NodeId) -> Behave {
        let node = &self.nodes[id.index()];
        match node.behavior_type() {
            BehaviorType::Action => self.behave_action(id),
            BehaviorType::Condition => self.behave_condition(id),
            BehaviorType::Decorator => self.behave_decorator(id),
            BehaviorType::Composite => match node.composite_type() {
                Some(CompositeType::Sequence) => self.behave_sequence(id),
                Some(CompositeType::Priority) => self.behave_priority(id),
                Some(CompositeType::Random) => self.behave_random(id),
                Some(CompositeType::Concurrent) => self.behave_concurrent(id),
                Some(CompositeType::Loop) => self.behave_loop(id),
                None => Ok(BehaviorResult::Failure),
            },
        }
    }

    /// Child `index` of composite `id`, if any.
    pub(crate) fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.index()].children().get(index).copied()
    }

    pub(crate) fn child_count(&self, id: NodeId) -> usize {
        self.nodes[id.index()].children().len()
    }

    /// Records `id` as the tracked running action and, when it replaces a
    /// different action from the previous tick, resets every node of the
    /// previous running path that is no longer on the current one.
    pub(crate) fn register_running_action(&mut self, id: NodeId) {
        self.state.running.insert(id);

        let Some(divergence) = self.state.stack.track(id) else {
            return;
        };
        let previous_len = self.state.stack.previous().len();
        if divergence >= previous_len {
            return;
        }

        // Siblings under a concurrent node are live side by side; the
        // end-of-tick sweep cleans whichever of them was really abandoned.
        if let Some(ancestor) = divergence
            .checked_sub(1)
            .and_then(|i| self.state.stack.previous().get(i).copied())
            && self.nodes[ancestor.index()].composite_type() == Some(CompositeType::Concurrent)
        {
            return;
        }

        tracing::debug!(
            "running action {} replaced {:?}; resetting {} abandoned node(s)",
            id,
            self.state.stack.previous().last(),
            previous_len - divergence
        );
        for position in divergence..previous_len {
            let stale = self.state.stack.previous()[position];
            reset_behavior(
                &mut self.nodes[stale.index()],
                stale,
                &mut self.state.running,
                self.ctx,
            );
        }
    }

    /// Resets every node under `id` (inclusive) that still remembers an
    /// unfinished execution.
    pub(crate) fn reset_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let node = &mut self.nodes[next.index()];
            pending.extend_from_slice(node.children());
            if node.holds_running_memory() || self.state.running.contains(next) {
                reset_behavior(node, next, &mut self.state.running, self.ctx);
            }
        }
    }
}

/// Resets nodes that hold running memory but were not visited by the tick that
/// just finished. Returns how many were reset.
pub(crate) fn sweep_stale<C>(nodes: &mut [Behavior<C>], state: &mut BehaviorState, ctx: &mut C) -> usize {
    let update_id = state.update_id();
    let mut swept = 0;
    for (index, node) in nodes.iter_mut().enumerate() {
        let id = NodeId::new(index);
        if node.last_update_id == update_id {
            continue;
        }
        if node.holds_running_memory() || state.running.contains(id) {
            reset_behavior(node, id, &mut state.running, ctx);
            swept += 1;
        }
    }
    swept
}

/// Clears a node's running memory, drops it from the running-action registry
/// and emits [`BehaviorEvent::Reset`].
pub(crate) fn reset_behavior<C>(
    node: &mut Behavior<C>,
    id: NodeId,
    running: &mut RunningActions,
    ctx: &mut C,
) {
    node.clear_running_memory();
    if matches!(node.kind, BehaviorKind::Action(_)) {
        running.remove(id);
    }
    tracing::trace!("reset {} `{}`", id, node.name());
    node.notify(ctx, BehaviorEvent::Reset);
}
