//! Error types surfaced by the engine.
//!
//! Two classes of failure exist and they are kept apart on purpose:
//!
//! - [`HandlerError`]: raised by game code inside an action, condition or gate
//!   handler. It is caught by the trace envelope, recorded on the tree state and
//!   the offending node fails for that tick. The tree keeps running.
//! - [`BehaviorError`]: the engine itself is misconfigured (trace buffer too
//!   small, access limit never registered). The tick is aborted and the error is
//!   handed back to the caller.
//!
//! [`BuildError`] covers tree assembly.

use thiserror::Error;

use crate::behavior::NodeId;
use crate::config::ConfigError;

/// Result type returned by handler callbacks.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Engine misconfiguration detected while ticking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError {
    #[error(
        "execution sequence exhausted after {capacity} entries; raise `max_sequence_length`"
    )]
    SequenceExhausted { capacity: usize },

    #[error("no access limit registered under key `{key}`")]
    MissingAccessLimit { key: String },

    #[error("node {0} does not exist in this tree")]
    UnknownNode(NodeId),

    #[error("node {0} is not an action")]
    NotAnAction(NodeId),
}

/// Invalid tree structure detected by [`TreeBuilder::build`](crate::TreeBuilder::build).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("node {0} was not created by this builder")]
    UnknownNode(NodeId),

    #[error("node {child} is attached to both {first} and {second}")]
    MultipleParents {
        child: NodeId,
        first: NodeId,
        second: NodeId,
    },

    #[error("root {root} is already a child of {parent}")]
    RootHasParent { root: NodeId, parent: NodeId },

    #[error("node {0} is not reachable from the root")]
    Unreachable(NodeId),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fault raised by a handler callback.
///
/// Handlers return `Err(HandlerError)` instead of panicking; the engine turns it
/// into a `Failure` for the node and keeps the most recent one on
/// [`BehaviorState::exception`](crate::BehaviorState::exception).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HandlerError {
    /// Creates a fault with a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a fault that wraps an underlying error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn handler_error_keeps_source() {
        let io = std::io::Error::other("socket closed");
        let err = HandlerError::with_source("navmesh query failed", io);

        assert_eq!(err.to_string(), "navmesh query failed");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("socket closed"));
    }

    #[test]
    fn missing_access_limit_names_key() {
        let err = BehaviorError::MissingAccessLimit {
            key: "attack".into(),
        };
        assert_eq!(err.to_string(), "no access limit registered under key `attack`");
    }
}
