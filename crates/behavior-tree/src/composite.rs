//! Composite nodes.
//!
//! Every composite shares the "resume from the running child" idiom and differs
//! in what it does with it:
//! - [`Sequence`](CompositeType::Sequence): all children must succeed, in order.
//! - [`Priority`](CompositeType::Priority): first child that does not fail wins.
//! - [`Random`](CompositeType::Random): one child, drawn by weight.
//! - [`Concurrent`](CompositeType::Concurrent): many children in the same tick.
//! - [`Loop`](CompositeType::Loop): a sequence repeated a number of times, one
//!   pass per tick at most.
//!
//! A composite without children returns `Failure`.

use rand::Rng;

use crate::behavior::{BehaviorKind, BehaviorType, NodeId};
use crate::status::BehaviorResult;
use crate::trace::{Behave, Executor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompositeType {
    Sequence,
    Priority,
    Random,
    Concurrent,
    Loop,
}

/// Where a priority selector starts its scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PriorityType {
    /// Rescan from the first child every tick; a higher-priority child preempts
    /// a running lower-priority one.
    #[default]
    HighestPriority,
    /// Resume at the child that was running.
    RunningNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// Any failing child fails the node.
    FailOnOne,
    /// Every child must fail.
    #[default]
    FailOnAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SuccessPolicy {
    /// Any succeeding child succeeds the node.
    SucceedOnOne,
    /// Every child must succeed.
    #[default]
    SucceedOnAll,
}

/// Settings of a concurrent composite.
///
/// When both policies trigger on the same child, failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConcurrentPolicy {
    pub failure: FailurePolicy,
    pub success: SuccessPolicy,
    /// Trace condition children in a pre-pass, before any other child.
    pub first_conditions: bool,
    /// A failing condition child fails the node whatever the policies say.
    pub break_on_condition_failure: bool,
}

impl Default for ConcurrentPolicy {
    fn default() -> Self {
        Self {
            failure: FailurePolicy::default(),
            success: SuccessPolicy::default(),
            first_conditions: true,
            break_on_condition_failure: false,
        }
    }
}

impl ConcurrentPolicy {
    pub fn new(failure: FailurePolicy, success: SuccessPolicy) -> Self {
        Self {
            failure,
            success,
            ..Self::default()
        }
    }

    fn failed(&self, failures: usize, total: usize) -> bool {
        match self.failure {
            FailurePolicy::FailOnOne => failures > 0,
            FailurePolicy::FailOnAll => failures == total,
        }
    }

    fn succeeded(&self, successes: usize, total: usize) -> bool {
        match self.success {
            SuccessPolicy::SucceedOnOne => successes > 0,
            SuccessPolicy::SucceedOnAll => successes == total,
        }
    }
}

/// Number of passes a loop makes before it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoopCount {
    Times(u32),
    #[default]
    Forever,
}

impl LoopCount {
    /// `n` passes, at least one.
    pub fn times(n: u32) -> Self {
        LoopCount::Times(n.max(1))
    }
}

/// Negative counts mean forever.
impl From<i32> for LoopCount {
    fn from(count: i32) -> Self {
        match u32::try_from(count) {
            Ok(n) => LoopCount::times(n),
            Err(_) => LoopCount::Forever,
        }
    }
}

#[derive(Debug, Clone)]
enum Selection {
    Sequence,
    Priority(PriorityType),
    Random,
    Concurrent {
        policy: ConcurrentPolicy,
        /// Settled results of the children that already finished during the
        /// current run of this node; `None` for children still to finish.
        outcomes: Vec<Option<BehaviorResult>>,
    },
    Loop {
        count: LoopCount,
        /// Completed passes in the current run.
        iteration: u32,
    },
}

/// Payload of a composite node: ordered children plus per-kind memory.
#[derive(Debug, Clone)]
pub struct Composite {
    children: Vec<NodeId>,
    running_child: Option<usize>,
    selection: Selection,
}

impl Composite {
    fn with_selection(children: impl IntoIterator<Item = NodeId>, selection: Selection) -> Self {
        Self {
            children: children.into_iter().collect(),
            running_child: None,
            selection,
        }
    }

    pub fn sequence(children: impl IntoIterator<Item = NodeId>) -> Self {
        Self::with_selection(children, Selection::Sequence)
    }

    pub fn priority(priority: PriorityType, children: impl IntoIterator<Item = NodeId>) -> Self {
        Self::with_selection(children, Selection::Priority(priority))
    }

    pub fn random(children: impl IntoIterator<Item = NodeId>) -> Self {
        Self::with_selection(children, Selection::Random)
    }

    pub fn concurrent(policy: ConcurrentPolicy, children: impl IntoIterator<Item = NodeId>) -> Self {
        let children: Vec<NodeId> = children.into_iter().collect();
        let outcomes = vec![None; children.len()];
        Self::with_selection(children, Selection::Concurrent { policy, outcomes })
    }

    /// A loop over `children`, repeated `count` times.
    pub fn repeat(count: impl Into<LoopCount>, children: impl IntoIterator<Item = NodeId>) -> Self {
        let selection = Selection::Loop {
            count: count.into(),
            iteration: 0,
        };
        Self::with_selection(children, selection)
    }

    pub fn composite_type(&self) -> CompositeType {
        match self.selection {
            Selection::Sequence => CompositeType::Sequence,
            Selection::Priority(_) => CompositeType::Priority,
            Selection::Random => CompositeType::Random,
            Selection::Concurrent { .. } => CompositeType::Concurrent,
            Selection::Loop { .. } => CompositeType::Loop,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Index of the child this composite resumes at next tick, if any.
    pub fn running_child_index(&self) -> Option<usize> {
        self.running_child
    }

    pub fn priority_type(&self) -> Option<PriorityType> {
        match self.selection {
            Selection::Priority(priority) => Some(priority),
            _ => None,
        }
    }

    pub fn concurrent_policy(&self) -> Option<&ConcurrentPolicy> {
        match &self.selection {
            Selection::Concurrent { policy, .. } => Some(policy),
            _ => None,
        }
    }

    pub fn loop_count(&self) -> Option<LoopCount> {
        match self.selection {
            Selection::Loop { count, .. } => Some(count),
            _ => None,
        }
    }

    /// Completed passes of a loop composite in its current run.
    pub fn loop_iteration(&self) -> Option<u32> {
        match self.selection {
            Selection::Loop { iteration, .. } => Some(iteration),
            _ => None,
        }
    }

    pub(crate) fn holds_running_memory(&self) -> bool {
        self.running_child.is_some()
            || match &self.selection {
                Selection::Concurrent { outcomes, .. } => outcomes.iter().any(Option::is_some),
                Selection::Loop { iteration, .. } => *iteration > 0,
                _ => false,
            }
    }

    pub(crate) fn clear_running_memory(&mut self) {
        self.running_child = None;
        match &mut self.selection {
            Selection::Concurrent { outcomes, .. } => outcomes.fill(None),
            Selection::Loop { iteration, .. } => *iteration = 0,
            _ => {}
        }
    }
}

/// Picks an index by weight.
///
/// `roll` is uniform in `[0, 1)`; it is scaled by the total weight and the
/// first index whose cumulative weight reaches it wins. Returns `None` when
/// there is nothing to pick from.
pub fn pick_weighted(weights: &[f32], roll: f64) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().map(|&w| f64::from(w)).sum();
    let target = roll * total;
    let mut cumulative = 0.0;
    for (index, &weight) in weights.iter().enumerate() {
        cumulative += f64::from(weight);
        if cumulative >= target {
            return Some(index);
        }
    }
    Some(weights.len() - 1)
}

fn tally(outcomes: &[Option<BehaviorResult>], wanted: BehaviorResult) -> usize {
    outcomes.iter().filter(|&&outcome| outcome == Some(wanted)).count()
}

impl<C> Executor<'_, C> {
    fn composite_mut(&mut self, id: NodeId) -> Option<&mut Composite> {
        match &mut self.nodes[id.index()].kind {
            BehaviorKind::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    fn set_running_child(&mut self, id: NodeId, index: Option<usize>) {
        if let Some(composite) = self.composite_mut(id) {
            composite.running_child = index;
        }
    }

    fn running_child(&mut self, id: NodeId) -> Option<usize> {
        self.composite_mut(id).and_then(|c| c.running_child)
    }

    pub(crate) fn behave_sequence(&mut self, id: NodeId) -> Behave {
        let count = self.child_count(id);
        if count == 0 {
            return Ok(BehaviorResult::Failure);
        }

        let start = self.running_child(id).unwrap_or(0);
        for index in start..count {
            let Some(child) = self.child_at(id, index) else {
                break;
            };
            match self.trace(child)? {
                BehaviorResult::Running => {
                    self.set_running_child(id, Some(index));
                    return Ok(BehaviorResult::Running);
                }
                BehaviorResult::Failure => {
                    self.set_running_child(id, None);
                    return Ok(BehaviorResult::Failure);
                }
                BehaviorResult::Success => {}
            }
        }

        self.set_running_child(id, None);
        Ok(BehaviorResult::Success)
    }

    pub(crate) fn behave_priority(&mut self, id: NodeId) -> Behave {
        let count = self.child_count(id);
        let priority = self
            .composite_mut(id)
            .and_then(|c| c.priority_type())
            .unwrap_or_default();

        let start = match priority {
            PriorityType::HighestPriority => 0,
            PriorityType::RunningNode => self.running_child(id).unwrap_or(0),
        };
        for index in start..count {
            let Some(child) = self.child_at(id, index) else {
                break;
            };
            match self.trace(child)? {
                BehaviorResult::Running => {
                    self.set_running_child(id, Some(index));
                    return Ok(BehaviorResult::Running);
                }
                BehaviorResult::Success => {
                    self.set_running_child(id, None);
                    return Ok(BehaviorResult::Success);
                }
                BehaviorResult::Failure => {}
            }
        }

        self.set_running_child(id, None);
        Ok(BehaviorResult::Failure)
    }

    pub(crate) fn behave_random(&mut self, id: NodeId) -> Behave {
        let index = match self.running_child(id) {
            Some(index) => index,
            None => {
                let weights: Vec<f32> = self.nodes[id.index()]
                    .children()
                    .iter()
                    .map(|child| self.nodes[child.index()].weight())
                    .collect();
                let roll = self.state.rng.gen_range(0.0..1.0);
                match pick_weighted(&weights, roll) {
                    Some(index) => index,
                    None => return Ok(BehaviorResult::Failure),
                }
            }
        };
        let Some(child) = self.child_at(id, index) else {
            self.set_running_child(id, None);
            return Ok(BehaviorResult::Failure);
        };

        let result = self.trace(child)?;
        self.set_running_child(id, result.is_running().then_some(index));
        Ok(result)
    }

    pub(crate) fn behave_concurrent(&mut self, id: NodeId) -> Behave {
        let count = self.child_count(id);
        let Some((policy, mut outcomes)) = self.composite_mut(id).and_then(|c| match &c.selection {
            Selection::Concurrent { policy, outcomes } => Some((*policy, outcomes.clone())),
            _ => None,
        }) else {
            return Ok(BehaviorResult::Failure);
        };
        if count == 0 {
            return Ok(BehaviorResult::Failure);
        }
        outcomes.resize(count, None);

        let conditions: Vec<bool> = (0..count)
            .map(|index| {
                self.child_at(id, index).is_some_and(|child| {
                    self.nodes[child.index()].behavior_type() == BehaviorType::Condition
                })
            })
            .collect();
        let order: Vec<usize> = if policy.first_conditions {
            let (mut order, rest): (Vec<usize>, Vec<usize>) =
                (0..count).partition(|&index| conditions[index]);
            order.extend(rest);
            order
        } else {
            (0..count).collect()
        };

        let mut running: Vec<usize> = Vec::new();
        let mut verdict = None;

        for index in order {
            if outcomes[index].is_some() {
                continue;
            }
            let Some(child) = self.child_at(id, index) else {
                continue;
            };
            let result = self.trace(child)?;
            if result.is_running() {
                running.push(index);
                continue;
            }
            outcomes[index] = Some(result);

            if result.is_failure() && conditions[index] && policy.break_on_condition_failure {
                verdict = Some(BehaviorResult::Failure);
                break;
            }
            if policy.failed(tally(&outcomes, BehaviorResult::Failure), count) {
                verdict = Some(BehaviorResult::Failure);
                break;
            }
            if policy.succeeded(tally(&outcomes, BehaviorResult::Success), count) {
                verdict = Some(BehaviorResult::Success);
                break;
            }
        }

        let result = match verdict {
            Some(result) => result,
            None if !running.is_empty() => BehaviorResult::Running,
            None => BehaviorResult::Failure,
        };

        if result.is_running() {
            if let Some(Composite {
                selection: Selection::Concurrent { outcomes: kept, .. },
                ..
            }) = self.composite_mut(id)
            {
                *kept = outcomes;
            }
        } else {
            if let Some(composite) = self.composite_mut(id) {
                composite.clear_running_memory();
            }
            // Children left running when the node settles are abandoned.
            for index in running {
                if let Some(child) = self.child_at(id, index) {
                    self.reset_subtree(child);
                }
            }
        }
        Ok(result)
    }

    pub(crate) fn behave_loop(&mut self, id: NodeId) -> Behave {
        let count = self.child_count(id);
        if count == 0 {
            return Ok(BehaviorResult::Failure);
        }

        let start = self.running_child(id).unwrap_or(0);
        for index in start..count {
            let Some(child) = self.child_at(id, index) else {
                break;
            };
            match self.trace(child)? {
                BehaviorResult::Running => {
                    self.set_running_child(id, Some(index));
                    return Ok(BehaviorResult::Running);
                }
                BehaviorResult::Failure => {
                    if let Some(composite) = self.composite_mut(id) {
                        composite.clear_running_memory();
                    }
                    return Ok(BehaviorResult::Failure);
                }
                BehaviorResult::Success => {}
            }
        }

        // One pass per tick: the next pass starts on the following tick.
        let Some(Composite {
            running_child,
            selection: Selection::Loop { count, iteration },
            ..
        }) = self.composite_mut(id)
        else {
            return Ok(BehaviorResult::Failure);
        };
        *running_child = None;
        *iteration = iteration.saturating_add(1);
        match *count {
            LoopCount::Times(times) if *iteration >= times => {
                *iteration = 0;
                Ok(BehaviorResult::Success)
            }
            _ => Ok(BehaviorResult::Running),
        }
    }
}
