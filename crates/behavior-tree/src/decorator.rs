//! Decorator nodes.
//!
//! A decorator wraps exactly one child. Its optional gate decides whether the
//! child may *start*; a child that was `Running` last time is always traced
//! again, so it can finish or fail properly.
//!
//! An access-limit decorator additionally takes a shared [`AccessLimit`] for
//! the duration of the child's trace in this tick.
//!
//! [`AccessLimit`]: crate::AccessLimit

use std::sync::Arc;

use crate::behavior::{Behavior, BehaviorKind, NodeId};
use crate::error::{BehaviorError, HandlerResult};
use crate::handler::GateHandler;
use crate::status::BehaviorResult;
use crate::trace::{Behave, Executor};

/// Flavour of decorator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecoratorType {
    Default,
    AccessLimit,
}

pub struct Decorator<C> {
    pub(crate) child: NodeId,
    gate: Option<Box<dyn GateHandler<C>>>,
    access_key: Option<Arc<str>>,
    success_on_gate_failure: bool,
    pub(crate) child_running: bool,
}

impl<C> Decorator<C> {
    /// Wraps `child` without a gate: the child is always traced and its result
    /// forwarded verbatim.
    pub fn new(child: NodeId) -> Self {
        Self {
            child,
            gate: None,
            access_key: None,
            success_on_gate_failure: true,
            child_running: false,
        }
    }

    /// Wraps `child` behind the shared access limit registered under `key`.
    pub fn access_limit(key: impl Into<Arc<str>>, child: NodeId) -> Self {
        Self {
            access_key: Some(key.into()),
            ..Self::new(child)
        }
    }

    /// Adds a gate closure (builder pattern).
    #[must_use]
    pub fn with_gate<F>(self, gate: F) -> Self
    where
        F: FnMut(&C) -> HandlerResult<bool> + Send + 'static,
    {
        self.with_gate_handler(gate)
    }

    #[must_use]
    pub fn with_gate_handler(mut self, gate: impl GateHandler<C> + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    /// Result returned when the gate refuses the child: `Success` when `true`
    /// (the default), `Failure` otherwise.
    #[must_use]
    pub fn success_on_gate_failure(mut self, value: bool) -> Self {
        self.success_on_gate_failure = value;
        self
    }

    pub fn child(&self) -> NodeId {
        self.child
    }

    pub fn decorator_type(&self) -> DecoratorType {
        if self.access_key.is_some() {
            DecoratorType::AccessLimit
        } else {
            DecoratorType::Default
        }
    }

    pub fn access_key(&self) -> Option<&str> {
        self.access_key.as_deref()
    }

    pub fn has_gate(&self) -> bool {
        self.gate.is_some()
    }

    /// Whether the child answered `Running` the last time it was traced.
    pub fn is_child_running(&self) -> bool {
        self.child_running
    }
}

impl<C> Executor<'_, C> {
    pub(crate) fn behave_decorator(&mut self, id: NodeId) -> Behave {
        let Behavior {
            kind: BehaviorKind::Decorator(decorator),
            ..
        } = &mut self.nodes[id.index()]
        else {
            return Ok(BehaviorResult::Failure);
        };

        let child = decorator.child;
        let access_key = decorator.access_key.clone();

        if !decorator.child_running
            && let Some(gate) = decorator.gate.as_mut()
            && !gate.allow(&*self.ctx)?
        {
            return Ok(BehaviorResult::from_bool(decorator.success_on_gate_failure));
        }

        let result = match access_key {
            Some(key) => self.trace_with_access(&key, child)?,
            None => self.trace(child)?,
        };

        if let BehaviorKind::Decorator(decorator) = &mut self.nodes[id.index()].kind {
            decorator.child_running = result.is_running();
        }
        Ok(result)
    }

    /// Traces `child` while holding the access limit registered under `key`.
    ///
    /// The lock is released as soon as the child returns, whatever it returned:
    /// a `Running` child does not keep the gate between ticks.
    fn trace_with_access(&mut self, key: &str, child: NodeId) -> Behave {
        let now = self.now;
        let Some(limit) = self.limits.get_mut(key) else {
            return Err(BehaviorError::MissingAccessLimit {
                key: key.to_owned(),
            }
            .into());
        };
        if !limit.lock(now) {
            tracing::trace!("access `{}` refused", key);
            return Ok(BehaviorResult::Failure);
        }

        let result = self.trace(child);

        if let Some(limit) = self.limits.get_mut(key) {
            limit.unlock(now);
        }
        Ok(result?)
    }
}
