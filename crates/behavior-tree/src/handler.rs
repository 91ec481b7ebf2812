//! Callback traits implemented by game code.
//!
//! Leaves and gates delegate their decision to a handler. Closures implement the
//! traits through blanket impls; stateful handlers can be written as plain
//! structs:
//!
//! ```rust,ignore
//! struct HasLineOfSight;
//!
//! impl ConditionHandler<Guard> for HasLineOfSight {
//!     fn check(&mut self, guard: &Guard, _: &Parameters) -> HandlerResult<bool> {
//!         Ok(guard.sees_target())
//!     }
//! }
//! ```

use crate::error::HandlerResult;
use crate::parameters::Parameters;
use crate::status::BehaviorResult;

/// Drives an [`Action`](crate::Action) leaf.
///
/// Returning `Running` keeps the action registered as still running, so it is
/// resumed next tick and can be force-updated between ticks.
pub trait ActionHandler<C>: Send {
    fn run(&mut self, ctx: &mut C, parameters: &Parameters) -> HandlerResult<BehaviorResult>;
}

impl<C, F> ActionHandler<C> for F
where
    F: FnMut(&mut C, &Parameters) -> HandlerResult<BehaviorResult> + Send,
{
    #[inline]
    fn run(&mut self, ctx: &mut C, parameters: &Parameters) -> HandlerResult<BehaviorResult> {
        self(ctx, parameters)
    }
}

/// Evaluates a [`Condition`](crate::Condition) leaf. Conditions never run over
/// several ticks.
pub trait ConditionHandler<C>: Send {
    fn check(&mut self, ctx: &C, parameters: &Parameters) -> HandlerResult<bool>;
}

impl<C, F> ConditionHandler<C> for F
where
    F: FnMut(&C, &Parameters) -> HandlerResult<bool> + Send,
{
    #[inline]
    fn check(&mut self, ctx: &C, parameters: &Parameters) -> HandlerResult<bool> {
        self(ctx, parameters)
    }
}

/// Decides whether a [`Decorator`](crate::Decorator) may start its child.
pub trait GateHandler<C>: Send {
    fn allow(&mut self, ctx: &C) -> HandlerResult<bool>;
}

impl<C, F> GateHandler<C> for F
where
    F: FnMut(&C) -> HandlerResult<bool> + Send,
{
    #[inline]
    fn allow(&mut self, ctx: &C) -> HandlerResult<bool> {
        self(ctx)
    }
}
