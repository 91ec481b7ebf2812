//! Behavior tree engine for real-time agents.
//!
//! A tree is ticked once per simulation step. Nodes may answer `Running`,
//! meaning "not finished, come back next tick"; composites remember where to
//! resume, and when a decision abandons a running branch the engine clears that
//! branch's memory on its own.
//!
//! - **Single-threaded ticks**: one call walks the reachable subtree and returns.
//!   Suspension only exists across ticks.
//! - **Arena nodes**: a tree is a flat `Vec` of nodes addressed by [`NodeId`].
//! - **Recoverable handler faults**: a failing callback fails its node for one
//!   tick and is kept on [`BehaviorState::exception`]; engine misconfiguration
//!   aborts the tick with a [`BehaviorError`].
//! - **Injected access limits**: decorators admit a bounded number of agents
//!   through a caller-owned [`AccessLimitRegistry`].
//!
//! # Architecture
//!
//! - [`Behavior`]: node envelope (name, weight, parameters, listeners)
//! - [`BehaviorKind`]: [`Action`], [`Condition`], [`Decorator`], [`Composite`]
//! - [`BehaviorTree`]: root, [`BehaviorState`] and the tick entry points
//! - [`RunningStack`]: cross-tick diff that resets preempted branches
//! - [`TreeBuilder`]: bottom-up assembly with structural checks

pub mod access;
pub mod behavior;
pub mod builder;
pub mod composite;
pub mod config;
pub mod decorator;
pub mod error;
pub mod handler;
pub mod leaf;
pub mod parameters;
pub mod running;
pub mod state;
pub mod status;
pub mod tree;

mod trace;

// Re-export core types for ergonomic API
pub use access::{AccessLimit, AccessLimitRegistry, CountAccessLimit, TimeAccessLimit};
pub use behavior::{Behavior, BehaviorEvent, BehaviorKind, BehaviorType, Listener, NodeId};
pub use builder::TreeBuilder;
pub use composite::{
    Composite, CompositeType, ConcurrentPolicy, FailurePolicy, LoopCount, PriorityType,
    SuccessPolicy,
};
pub use config::{ConfigError, TreeConfig};
pub use decorator::{Decorator, DecoratorType};
pub use error::{BehaviorError, BuildError, HandlerError, HandlerResult};
pub use handler::{ActionHandler, ConditionHandler, GateHandler};
pub use leaf::{Action, Condition};
pub use parameters::{Parameter, ParameterValue, Parameters};
pub use running::{RunningActions, RunningStack};
pub use state::{BehaviorState, ExecutionRecord, HandlerFault};
pub use status::BehaviorResult;
pub use tree::{BehaviorTree, TickStatus, TraceEntry, TraceSink};
