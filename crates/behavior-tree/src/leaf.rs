//! Leaf nodes: [`Action`] and [`Condition`].

use crate::behavior::{Behavior, BehaviorKind, NodeId};
use crate::error::{BehaviorError, HandlerResult};
use crate::handler::{ActionHandler, ConditionHandler};
use crate::parameters::Parameters;
use crate::running::RunningActions;
use crate::state::BehaviorState;
use crate::status::BehaviorResult;
use crate::trace::{Behave, Executor};

/// Leaf that does something in the world.
///
/// The handler may answer `Running`; the action is then kept in the tree's
/// running-action registry so it resumes next tick and can be updated
/// immediately between ticks (e.g. when an animation event completes it).
pub struct Action<C> {
    handler: Box<dyn ActionHandler<C>>,
    /// Set when the action was driven outside the tree this frame; the next
    /// trace returns the cached result instead of invoking the handler again.
    pub(crate) already_updated: bool,
}

impl<C> Action<C> {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&mut C, &Parameters) -> HandlerResult<BehaviorResult> + Send + 'static,
    {
        Self::from_handler(handler)
    }

    pub fn from_handler(handler: impl ActionHandler<C> + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            already_updated: false,
        }
    }

    pub fn already_updated(&self) -> bool {
        self.already_updated
    }
}

/// Leaf that tests a predicate. Never returns `Running`.
pub struct Condition<C> {
    handler: Box<dyn ConditionHandler<C>>,
    reverse: bool,
}

impl<C> Condition<C> {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&C, &Parameters) -> HandlerResult<bool> + Send + 'static,
    {
        Self::from_handler(handler)
    }

    pub fn from_handler(handler: impl ConditionHandler<C> + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            reverse: false,
        }
    }

    /// Inverts the verdict before it is mapped to a result.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }
}

impl<C> Executor<'_, C> {
    pub(crate) fn behave_action(&mut self, id: NodeId) -> Behave {
        let Behavior {
            kind: BehaviorKind::Action(action),
            parameters,
            last_result,
            ..
        } = &mut self.nodes[id.index()]
        else {
            return Ok(BehaviorResult::Failure);
        };

        let result = if action.already_updated {
            *last_result
        } else {
            match action.handler.run(self.ctx, parameters) {
                Ok(result) => result,
                Err(error) => {
                    self.state.running.remove(id);
                    return Err(error.into());
                }
            }
        };

        if result.is_running() {
            self.register_running_action(id);
        } else {
            self.state.running.remove(id);
        }
        Ok(result)
    }

    pub(crate) fn behave_condition(&mut self, id: NodeId) -> Behave {
        let Behavior {
            kind: BehaviorKind::Condition(condition),
            parameters,
            ..
        } = &mut self.nodes[id.index()]
        else {
            return Ok(BehaviorResult::Failure);
        };

        let verdict = condition.handler.check(&*self.ctx, parameters)?;
        Ok(BehaviorResult::from_bool(verdict != condition.reverse))
    }
}

/// Drives a running action outside the top-down tick.
///
/// Faults are recorded on `state` and turn into `Failure`, as in a normal trace.
pub(crate) fn update_immediately<C>(
    node: &mut Behavior<C>,
    id: NodeId,
    state: &mut BehaviorState,
    ctx: &mut C,
) -> Result<BehaviorResult, BehaviorError> {
    let Behavior {
        kind: BehaviorKind::Action(action),
        parameters,
        ..
    } = &mut *node
    else {
        return Err(BehaviorError::NotAnAction(id));
    };

    let outcome = action.handler.run(ctx, parameters);
    action.already_updated = true;

    let result = match outcome {
        Ok(result) => result,
        Err(error) => {
            tracing::debug!("immediate update of {} faulted: {}", id, error);
            state.record_fault(id, node.name(), error);
            BehaviorResult::Failure
        }
    };
    node.last_result = result;
    node.notify(ctx, result.into());
    Ok(result)
}

/// Clears the immediate-update flag and, when `id` is no longer running,
/// removes it from the registry.
pub(crate) fn settle_immediate<C>(node: &mut Behavior<C>, id: NodeId, running: &mut RunningActions) {
    if let BehaviorKind::Action(action) = &mut node.kind {
        action.already_updated = false;
    }
    if !node.last_result.is_running() {
        running.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessLimitRegistry;
    use crate::builder::TreeBuilder;
    use crate::error::HandlerError;

    #[derive(Default)]
    struct Door {
        open: bool,
        pushes: u32,
    }

    fn push(door: &mut Door, _: &Parameters) -> HandlerResult<BehaviorResult> {
        door.pushes += 1;
        Ok(if door.pushes >= 2 {
            BehaviorResult::Success
        } else {
            BehaviorResult::Running
        })
    }

    #[test]
    fn reversed_condition_inverts_verdict() {
        let mut builder = TreeBuilder::new();
        let closed = builder.add(Behavior::new(
            "Closed?",
            Condition::new(|door: &Door, _: &Parameters| Ok(door.open)).reversed(),
        ));
        let root = builder.sequence("Root", [closed]);
        let mut tree = builder.build(root).unwrap();
        let mut limits = AccessLimitRegistry::new();

        let mut door = Door::default();
        assert_eq!(tree.force_update(&mut door, &mut limits, 0.0), Ok(BehaviorResult::Success));
        door.open = true;
        assert_eq!(tree.force_update(&mut door, &mut limits, 1.0), Ok(BehaviorResult::Failure));
    }

    #[test]
    fn faulting_action_leaves_running_registry() {
        let mut builder = TreeBuilder::new();
        let stuck = builder.action("Stuck", |door: &mut Door, _: &Parameters| {
            door.pushes += 1;
            if door.pushes > 1 {
                Err(HandlerError::new("hinge broke"))
            } else {
                Ok(BehaviorResult::Running)
            }
        });
        let root = builder.sequence("Root", [stuck]);
        let mut tree = builder.build(root).unwrap();
        let mut limits = AccessLimitRegistry::new();
        let mut door = Door::default();

        tree.force_update(&mut door, &mut limits, 0.0).unwrap();
        assert!(tree.state().running_actions().contains(stuck));

        assert_eq!(tree.force_update(&mut door, &mut limits, 1.0), Ok(BehaviorResult::Failure));
        assert!(tree.state().running_actions().is_empty());
        assert_eq!(tree.state().exception().map(|f| f.name.as_str()), Some("Stuck"));
    }

    #[test]
    fn immediate_update_is_not_repeated_by_next_tick() {
        let mut builder = TreeBuilder::new();
        let push = builder.action("Push", push);
        let root = builder.sequence("Root", [push]);
        let mut tree = builder.build(root).unwrap();
        let mut limits = AccessLimitRegistry::new();
        let mut door = Door::default();

        assert_eq!(tree.force_update(&mut door, &mut limits, 0.0), Ok(BehaviorResult::Running));
        assert_eq!(tree.update_action(push, &mut door), Ok(BehaviorResult::Success));
        assert_eq!(door.pushes, 2);

        assert_eq!(tree.force_update(&mut door, &mut limits, 1.0), Ok(BehaviorResult::Success));
        assert_eq!(door.pushes, 2, "cached result answered the tick");
        assert!(tree.state().running_actions().is_empty());
    }
}
