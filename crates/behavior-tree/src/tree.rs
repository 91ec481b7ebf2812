//! The per-agent tree: one root, one state, one tick entry point.

use core::fmt;
use core::fmt::Write as _;

use crate::access::AccessLimitRegistry;
use crate::behavior::{Behavior, NodeId};
use crate::config::TreeConfig;
use crate::error::BehaviorError;
use crate::leaf::{settle_immediate, update_immediately};
use crate::state::BehaviorState;
use crate::status::BehaviorResult;
use crate::trace::{Executor, reset_behavior, sweep_stale};

/// What a call to [`BehaviorTree::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// The update interval has not elapsed; nothing ran.
    Skipped,
    /// Only the running actions were driven; none of them finished.
    RunningActionsUpdated,
    /// A full tick ran from the root.
    Ticked(BehaviorResult),
}

/// One visited node, as handed to a trace sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry<'a> {
    pub node: NodeId,
    pub name: &'a str,
    pub depth: usize,
    pub result: Option<BehaviorResult>,
}

/// Diagnostic callback receiving the nodes visited by each full tick.
pub type TraceSink = Box<dyn FnMut(&[TraceEntry<'_>]) + Send>;

pub struct BehaviorTree<C> {
    nodes: Vec<Behavior<C>>,
    root: NodeId,
    state: BehaviorState,
    config: TreeConfig,
    last_update: Option<f64>,
    /// Actions driven by `update_action` since the last full tick.
    immediate: Vec<NodeId>,
    sink: Option<TraceSink>,
}

impl<C> BehaviorTree<C> {
    pub(crate) fn new(nodes: Vec<Behavior<C>>, root: NodeId, config: TreeConfig) -> Self {
        Self {
            state: BehaviorState::new(config.max_sequence_length, config.seed),
            nodes,
            root,
            config,
            last_update: None,
            immediate: Vec::new(),
            sink: None,
        }
    }

    /// Ticks the tree at simulated time `now`, honouring the update interval.
    ///
    /// Before the interval has elapsed, the tree either does nothing or, with
    /// `continuous_update`, drives its running actions; if one of them finishes
    /// a full tick follows right away.
    pub fn update(
        &mut self,
        ctx: &mut C,
        limits: &mut AccessLimitRegistry,
        now: f64,
    ) -> Result<TickStatus, BehaviorError> {
        if let Some(last) = self.last_update
            && now - last < self.config.update_interval
        {
            if !self.config.continuous_update || self.state.running.is_empty() {
                return Ok(TickStatus::Skipped);
            }
            if !self.update_running_actions(ctx)? {
                return Ok(TickStatus::RunningActionsUpdated);
            }
        }
        self.force_update(ctx, limits, now).map(TickStatus::Ticked)
    }

    /// Runs a full tick from the root, ignoring the update interval.
    pub fn force_update(
        &mut self,
        ctx: &mut C,
        limits: &mut AccessLimitRegistry,
        now: f64,
    ) -> Result<BehaviorResult, BehaviorError> {
        self.last_update = Some(now);
        self.state.begin();

        let outcome = Executor {
            nodes: &mut self.nodes,
            state: &mut self.state,
            limits,
            ctx: &mut *ctx,
            now,
        }
        .trace(self.root);

        let swept = sweep_stale(&mut self.nodes, &mut self.state, ctx);
        if swept > 0 {
            tracing::debug!("reset {} abandoned node(s) after tick {}", swept, self.state.update_id());
        }
        for id in self.immediate.drain(..) {
            settle_immediate(&mut self.nodes[id.index()], id, &mut self.state.running);
        }

        match &outcome {
            Ok(result) => tracing::debug!("tick {} -> {}", self.state.update_id(), result),
            Err(error) => tracing::warn!("tick {} aborted: {}", self.state.update_id(), error),
        }
        if let Some(fault) = self.state.exception() {
            tracing::warn!("node `{}` {} faulted: {}", fault.name, fault.node, fault.error);
        }
        self.emit_trace();
        outcome
    }

    /// Drives action `id` outside the top-down tick.
    ///
    /// The next full tick answers with this result instead of running the
    /// handler again.
    pub fn update_action(&mut self, id: NodeId, ctx: &mut C) -> Result<BehaviorResult, BehaviorError> {
        let node = self.nodes.get_mut(id.index()).ok_or(BehaviorError::UnknownNode(id))?;
        let result = update_immediately(node, id, &mut self.state, ctx)?;

        if !self.immediate.contains(&id) {
            self.immediate.push(id);
        }
        if result.is_running() {
            self.state.running.insert(id);
        } else {
            self.state.running.remove(id);
        }
        Ok(result)
    }

    /// Drives every registered running action once. Returns `true` if any of
    /// them finished.
    pub fn update_running_actions(&mut self, ctx: &mut C) -> Result<bool, BehaviorError> {
        let running = self.state.running.as_slice().to_vec();
        let mut finished = false;
        for id in running {
            if !self.update_action(id, ctx)?.is_running() {
                finished = true;
            }
        }
        Ok(finished)
    }

    /// Resets every node and forgets all running executions, e.g. when the
    /// agent dies or is despawned.
    pub fn reset(&mut self, ctx: &mut C) {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            reset_behavior(node, NodeId::new(index), &mut self.state.running, ctx);
        }
        self.state.reset();
        self.immediate.clear();
        tracing::debug!("tree `{}` reset", self.nodes[self.root.index()].name());
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Behavior<C>> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Behavior<C>> {
        self.nodes.get_mut(id.index())
    }

    /// First node named `name`, in creation order.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name() == name)
            .map(NodeId::new)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn state(&self) -> &BehaviorState {
        &self.state
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Simulated time of the last full tick.
    pub fn last_update(&self) -> Option<f64> {
        self.last_update
    }

    pub fn set_trace_sink<F>(&mut self, sink: F)
    where
        F: FnMut(&[TraceEntry<'_>]) + Send + 'static,
    {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear_trace_sink(&mut self) {
        self.sink = None;
    }

    fn emit_trace(&mut self) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let entries: Vec<TraceEntry<'_>> = self
            .state
            .execution_sequence()
            .iter()
            .map(|record| TraceEntry {
                node: record.node,
                name: self.nodes[record.node.index()].name(),
                depth: record.depth,
                result: record.result,
            })
            .collect();
        sink(&entries);
    }

    /// Visited nodes of the last tick on one line: `Root(running) > Attack(running)`.
    pub fn format_execution_sequence(&self) -> String {
        let mut out = String::new();
        for (i, record) in self.state.execution_sequence().iter().enumerate() {
            if i > 0 {
                out.push_str(" > ");
            }
            let _ = write!(out, "{}({})", self.nodes[record.node.index()].name(), ResultLabel(record.result));
        }
        out
    }

    /// Visited nodes of the last tick, one per line, indented by depth.
    pub fn format_execution_tree(&self) -> String {
        let mut out = String::new();
        for record in self.state.execution_sequence() {
            let _ = writeln!(
                out,
                "{:indent$}{}: {}",
                "",
                self.nodes[record.node.index()].name(),
                ResultLabel(record.result),
                indent = record.depth * 2
            );
        }
        out
    }

    /// Writes the last tick's execution sequence to the `debug` log.
    pub fn log_execution_sequence(&self) {
        tracing::debug!(
            "tick {} sequence: {}",
            self.state.update_id(),
            self.format_execution_sequence()
        );
    }
}

struct ResultLabel(Option<BehaviorResult>);

impl fmt::Display for ResultLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(result) => fmt::Display::fmt(&result, f),
            None => f.write_str("aborted"),
        }
    }
}

impl<C> fmt::Debug for BehaviorTree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorTree")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("config", &self.config)
            .field("update_id", &self.state.update_id())
            .field("last_update", &self.last_update)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::builder::TreeBuilder;
    use crate::error::HandlerError;
    use crate::parameters::Parameters;

    #[derive(Default)]
    struct Walker {
        steps: u32,
        arrive_at: u32,
    }

    fn walk(walker: &mut Walker, _: &Parameters) -> Result<BehaviorResult, HandlerError> {
        walker.steps += 1;
        Ok(if walker.steps >= walker.arrive_at {
            BehaviorResult::Success
        } else {
            BehaviorResult::Running
        })
    }

    fn walking_tree(config: TreeConfig) -> (BehaviorTree<Walker>, NodeId) {
        let mut builder = TreeBuilder::new();
        let walk = builder.action("Walk", walk);
        let root = builder.sequence("Root", [walk]);
        (builder.build_with_config(root, config).unwrap(), walk)
    }

    #[test]
    fn update_respects_interval() {
        let (mut tree, _) = walking_tree(TreeConfig::default().with_update_interval(1.0));
        let mut walker = Walker {
            arrive_at: 10,
            ..Walker::default()
        };
        let mut limits = AccessLimitRegistry::new();

        assert_eq!(
            tree.update(&mut walker, &mut limits, 0.0),
            Ok(TickStatus::Ticked(BehaviorResult::Running))
        );
        assert_eq!(tree.update(&mut walker, &mut limits, 0.5), Ok(TickStatus::Skipped));
        assert_eq!(
            tree.update(&mut walker, &mut limits, 1.0),
            Ok(TickStatus::Ticked(BehaviorResult::Running))
        );
        assert_eq!(walker.steps, 2);
        assert_eq!(tree.state().update_id(), 2);
    }

    #[test]
    fn continuous_update_drives_running_actions_between_ticks() {
        let config = TreeConfig::default()
            .with_update_interval(1.0)
            .with_continuous_update(true);
        let (mut tree, walk) = walking_tree(config);
        let mut walker = Walker {
            arrive_at: 3,
            ..Walker::default()
        };
        let mut limits = AccessLimitRegistry::new();

        assert_eq!(
            tree.update(&mut walker, &mut limits, 0.0),
            Ok(TickStatus::Ticked(BehaviorResult::Running))
        );
        assert!(tree.state().running_actions().contains(walk));

        assert_eq!(
            tree.update(&mut walker, &mut limits, 0.1),
            Ok(TickStatus::RunningActionsUpdated)
        );
        // Third step arrives: a full tick follows, reusing the cached result.
        assert_eq!(
            tree.update(&mut walker, &mut limits, 0.2),
            Ok(TickStatus::Ticked(BehaviorResult::Success))
        );
        assert_eq!(walker.steps, 3);
        assert!(tree.state().running_actions().is_empty());
        assert!(tree.node(walk).and_then(|n| n.as_action()).is_some_and(|a| !a.already_updated()));
    }

    #[test]
    fn update_action_rejects_non_actions() {
        let (mut tree, _) = walking_tree(TreeConfig::default());
        let root = tree.root();
        let mut walker = Walker::default();
        assert_eq!(tree.update_action(root, &mut walker), Err(BehaviorError::NotAnAction(root)));
        assert_eq!(
            tree.update_action(NodeId::new(42), &mut walker),
            Err(BehaviorError::UnknownNode(NodeId::new(42)))
        );
    }

    #[test]
    fn sequence_exhaustion_aborts_tick() {
        let mut builder = TreeBuilder::new();
        let children: Vec<NodeId> = (0..4)
            .map(|i| builder.action(format!("Step{i}"), walk))
            .collect();
        let root = builder.sequence("Root", children);
        let config = TreeConfig::default().with_max_sequence_length(3);
        let mut tree = builder.build_with_config(root, config).unwrap();

        let mut walker = Walker::default();
        let mut limits = AccessLimitRegistry::new();
        assert_eq!(
            tree.force_update(&mut walker, &mut limits, 0.0),
            Err(BehaviorError::SequenceExhausted { capacity: 3 })
        );
    }

    #[test]
    fn handler_fault_degrades_to_failure() {
        let mut builder = TreeBuilder::new();
        let broken = builder.action("Broken", |_: &mut Walker, _: &Parameters| {
            Err(HandlerError::new("path blocked"))
        });
        let fallback = builder.action("Fallback", walk);
        let root = builder.priority("Root", Default::default(), [broken, fallback]);
        let mut tree = builder.build(root).unwrap();

        let mut walker = Walker::default();
        let mut limits = AccessLimitRegistry::new();
        assert_eq!(
            tree.force_update(&mut walker, &mut limits, 0.0),
            Ok(BehaviorResult::Success)
        );
        let fault = tree.state().exception().expect("fault kept after tick");
        assert_eq!(fault.node, broken);
        assert_eq!(fault.error.to_string(), "path blocked");

        // Each tick starts clean and records its own fault.
        tree.force_update(&mut walker, &mut limits, 1.0).unwrap();
        assert!(tree.state().exception().is_some());
        assert_eq!(walker.steps, 2);
    }

    #[test]
    fn reset_forgets_running_work() {
        let (mut tree, walk) = walking_tree(TreeConfig::default());
        let mut walker = Walker {
            arrive_at: 10,
            ..Walker::default()
        };
        let mut limits = AccessLimitRegistry::new();
        tree.force_update(&mut walker, &mut limits, 0.0).unwrap();
        assert!(tree.state().running_actions().contains(walk));

        tree.reset(&mut walker);
        assert!(tree.state().running_actions().is_empty());
        assert!(tree.state().running_stack().current().is_empty());
        assert_eq!(
            tree.node(tree.root())
                .and_then(|n| n.as_composite())
                .and_then(|c| c.running_child_index()),
            None
        );
    }

    #[test]
    fn trace_sink_and_formatting() {
        let (mut tree, _) = walking_tree(TreeConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        tree.set_trace_sink(move |entries| {
            let mut seen = sink.lock().unwrap();
            seen.extend(entries.iter().map(|e| (e.name.to_owned(), e.depth, e.result)));
        });

        let mut walker = Walker {
            arrive_at: 5,
            ..Walker::default()
        };
        let mut limits = AccessLimitRegistry::new();
        tree.force_update(&mut walker, &mut limits, 0.0).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("Root".to_owned(), 0, Some(BehaviorResult::Running)),
                ("Walk".to_owned(), 1, Some(BehaviorResult::Running)),
            ]
        );
        assert_eq!(tree.format_execution_sequence(), "Root(running) > Walk(running)");
        assert_eq!(tree.format_execution_tree(), "Root: running\n  Walk: running\n");
    }
}
