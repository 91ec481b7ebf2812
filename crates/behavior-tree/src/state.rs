//! Per-tree execution context.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::behavior::NodeId;
use crate::error::{BehaviorError, HandlerError};
use crate::running::{RunningActions, RunningStack};
use crate::status::BehaviorResult;

/// One visited node in the execution sequence of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub node: NodeId,
    /// Distance from the root (root = 0).
    pub depth: usize,
    /// `None` while the node is still being traced.
    pub result: Option<BehaviorResult>,
}

/// Handler fault captured during a tick.
#[derive(Debug)]
pub struct HandlerFault {
    pub node: NodeId,
    pub name: String,
    pub error: HandlerError,
}

/// State shared by all nodes of one tree while it ticks.
///
/// Owns the bounded execution-sequence buffer, the most recent handler fault,
/// the running-action registry, the running stack and the tree's random source.
#[derive(Debug)]
pub struct BehaviorState {
    sequence: Vec<ExecutionRecord>,
    capacity: usize,
    exception: Option<HandlerFault>,
    update_id: u64,
    pub(crate) running: RunningActions,
    pub(crate) stack: RunningStack,
    pub(crate) rng: StdRng,
}

impl BehaviorState {
    /// Creates a state whose execution sequence holds at most `capacity` entries.
    pub fn new(capacity: usize, seed: Option<u64>) -> Self {
        Self {
            sequence: Vec::with_capacity(capacity),
            capacity,
            exception: None,
            update_id: 0,
            running: RunningActions::default(),
            stack: RunningStack::with_capacity(capacity),
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        }
    }

    /// Starts a tick: clears the execution sequence and the last fault, swaps
    /// the running-stack buffers and advances the update id.
    pub fn begin(&mut self) {
        self.update_id += 1;
        self.sequence.clear();
        self.exception = None;
        self.stack.begin();
    }

    /// Appends `id` to the execution sequence and returns its slot.
    pub(crate) fn register_for_execution(&mut self, id: NodeId) -> Result<usize, BehaviorError> {
        if self.sequence.len() >= self.capacity {
            return Err(BehaviorError::SequenceExhausted {
                capacity: self.capacity,
            });
        }
        self.sequence.push(ExecutionRecord {
            node: id,
            depth: self.stack.path().len(),
            result: None,
        });
        Ok(self.sequence.len() - 1)
    }

    pub(crate) fn complete(&mut self, slot: usize, result: BehaviorResult) {
        if let Some(record) = self.sequence.get_mut(slot) {
            record.result = Some(result);
        }
    }

    pub(crate) fn record_fault(&mut self, node: NodeId, name: &str, error: HandlerError) {
        self.exception = Some(HandlerFault {
            node,
            name: name.to_owned(),
            error,
        });
    }

    pub(crate) fn reset(&mut self) {
        self.running.clear();
        self.stack.clear();
        self.sequence.clear();
    }

    /// Nodes traced during the last tick, in visiting order.
    pub fn execution_sequence(&self) -> &[ExecutionRecord] {
        &self.sequence
    }

    /// Capacity of the execution sequence.
    pub fn max_sequence_length(&self) -> usize {
        self.capacity
    }

    /// The most recent handler fault of the current tick, if any.
    pub fn exception(&self) -> Option<&HandlerFault> {
        self.exception.as_ref()
    }

    /// Number of full ticks started so far.
    pub fn update_id(&self) -> u64 {
        self.update_id
    }

    pub fn running_actions(&self) -> &RunningActions {
        &self.running
    }

    pub fn running_stack(&self) -> &RunningStack {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_bounded() {
        let mut state = BehaviorState::new(2, Some(1));
        state.begin();
        assert_eq!(state.register_for_execution(NodeId::new(0)), Ok(0));
        assert_eq!(state.register_for_execution(NodeId::new(1)), Ok(1));
        assert_eq!(
            state.register_for_execution(NodeId::new(2)),
            Err(BehaviorError::SequenceExhausted { capacity: 2 })
        );
    }

    #[test]
    fn begin_clears_fault_and_sequence() {
        let mut state = BehaviorState::new(4, Some(1));
        state.begin();
        let slot = state.register_for_execution(NodeId::new(0)).unwrap();
        state.complete(slot, BehaviorResult::Success);
        state.record_fault(NodeId::new(0), "Attack", HandlerError::new("boom"));
        assert_eq!(state.update_id(), 1);

        state.begin();
        assert!(state.exception().is_none());
        assert!(state.execution_sequence().is_empty());
        assert_eq!(state.update_id(), 2);
    }
}
