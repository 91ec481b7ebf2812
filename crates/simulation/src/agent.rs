//! Guard agents and their behavior tree.
//!
//! ```text
//! Guard (priority, highest first)
//! ├── Engage (sequence)
//! │   ├── PlayerInReach?
//! │   └── AttackSlot [access "attack"]
//! │       └── Swing           (runs `SWING_STEPS` ticks, fails out of reach)
//! ├── Alarm [gate: sees player, access "shout"]
//! │   └── Shout
//! ├── Chase [gate: sees player]
//! │   └── Approach            (runs until in reach)
//! └── Patrol (random)
//!     ├── Wander  (weight 3)
//!     └── Idle
//! ```

use behavior_tree::{
    ActionHandler, Behavior, BehaviorEvent, BehaviorResult, BehaviorTree, BuildError,
    ConditionHandler, Decorator, HandlerError, HandlerResult, Parameters, PriorityType,
    TreeBuilder, TreeConfig,
};

pub const ATTACK_KEY: &str = "attack";
pub const SHOUT_KEY: &str = "shout";

/// Ticks a swing takes before it lands.
pub const SWING_STEPS: u32 = 3;

/// Per-guard state the tree reads and mutates.
#[derive(Debug, Clone, Default)]
pub struct Guard {
    pub id: usize,
    pub position: f64,
    /// Player position as seen this step.
    pub player: f64,
    pub swing_progress: u32,
    pub hits: u32,
    pub shouts: u32,
    pub interrupted_swings: u32,
}

impl Guard {
    pub fn new(id: usize, position: f64) -> Self {
        Self {
            id,
            position,
            ..Self::default()
        }
    }

    pub fn distance(&self) -> f64 {
        (self.player - self.position).abs()
    }
}

/// Player within `reach`.
pub struct PlayerInReach;

impl ConditionHandler<Guard> for PlayerInReach {
    fn check(&mut self, guard: &Guard, parameters: &Parameters) -> HandlerResult<bool> {
        let reach = parameters
            .get_float("reach")
            .ok_or_else(|| HandlerError::new("missing `reach` parameter"))?;
        Ok(guard.distance() <= reach)
    }
}

/// Winds up for `SWING_STEPS` ticks, then lands `damage`. The swing is lost
/// if the player leaves `reach` before it lands.
pub struct Swing;

impl ActionHandler<Guard> for Swing {
    fn run(&mut self, guard: &mut Guard, parameters: &Parameters) -> HandlerResult<BehaviorResult> {
        let reach = parameters.get_float("reach").unwrap_or(1.0);
        if guard.distance() > reach {
            if guard.swing_progress > 0 {
                guard.swing_progress = 0;
                guard.interrupted_swings += 1;
            }
            return Ok(BehaviorResult::Failure);
        }
        guard.swing_progress += 1;
        if guard.swing_progress < SWING_STEPS {
            return Ok(BehaviorResult::Running);
        }
        guard.swing_progress = 0;
        guard.hits += 1;
        tracing::debug!(
            "guard {} hits for {}",
            guard.id,
            parameters.get_int("damage").unwrap_or(1)
        );
        Ok(BehaviorResult::Success)
    }
}

/// Moves toward the player by `speed` per tick until within `reach`.
pub struct Approach;

impl ActionHandler<Guard> for Approach {
    fn run(&mut self, guard: &mut Guard, parameters: &Parameters) -> HandlerResult<BehaviorResult> {
        let speed = parameters.get_float("speed").unwrap_or(0.5);
        let reach = parameters.get_float("reach").unwrap_or(1.0);
        if guard.distance() <= reach {
            return Ok(BehaviorResult::Success);
        }
        let step = speed.min(guard.distance() - reach);
        guard.position += step.copysign(guard.player - guard.position);
        Ok(BehaviorResult::Running)
    }
}

fn sees_player(guard: &Guard) -> HandlerResult<bool> {
    Ok(guard.distance() <= 5.0)
}

/// Builds one guard's tree.
pub fn guard_tree(config: TreeConfig) -> Result<BehaviorTree<Guard>, BuildError> {
    const REACH: f64 = 1.0;

    let mut builder = TreeBuilder::new();

    let in_reach = builder.add(
        Behavior::new("PlayerInReach?", behavior_tree::Condition::from_handler(PlayerInReach))
            .with_parameters(Parameters::new().with("reach", REACH)),
    );
    let swing = builder.add(
        Behavior::new("Swing", behavior_tree::Action::from_handler(Swing))
            .with_parameters(Parameters::new().with("damage", 5).with("reach", REACH))
            .on_event(|guard: &mut Guard, event| {
                if event == BehaviorEvent::Reset && guard.swing_progress > 0 {
                    guard.swing_progress = 0;
                    guard.interrupted_swings += 1;
                }
            }),
    );
    let attack_slot = builder.access_limit("AttackSlot", ATTACK_KEY, swing);
    let engage = builder.sequence("Engage", [in_reach, attack_slot]);

    let shout = builder.action("Shout", |guard: &mut Guard, _: &Parameters| {
        guard.shouts += 1;
        Ok(BehaviorResult::Success)
    });
    let alarm = builder.decorator(
        "Alarm",
        Decorator::access_limit(SHOUT_KEY, shout)
            .with_gate(sees_player)
            .success_on_gate_failure(false),
    );

    let approach = builder.add(
        Behavior::new("Approach", behavior_tree::Action::from_handler(Approach))
            .with_parameters(Parameters::new().with("speed", 0.4).with("reach", REACH)),
    );
    let chase = builder.decorator(
        "Chase",
        Decorator::new(approach)
            .with_gate(sees_player)
            .success_on_gate_failure(false),
    );

    let wander = builder.add(
        Behavior::new(
            "Wander",
            behavior_tree::Action::new(|guard: &mut Guard, _: &Parameters| {
                guard.position += if guard.id % 2 == 0 { 0.1 } else { -0.1 };
                Ok(BehaviorResult::Success)
            }),
        )
        .with_weight(3.0),
    );
    let idle = builder.action("Idle", |_: &mut Guard, _: &Parameters| Ok(BehaviorResult::Success));
    let patrol = builder.random("Patrol", [wander, idle]);

    let root = builder.priority(
        "Guard",
        PriorityType::HighestPriority,
        [engage, alarm, chase, patrol],
    );
    builder.build_with_config(root, config)
}

#[cfg(test)]
mod tests {
    use behavior_tree::{AccessLimitRegistry, CountAccessLimit, TimeAccessLimit};

    use super::*;

    fn limits(max_attackers: u32) -> AccessLimitRegistry {
        let mut limits = AccessLimitRegistry::new();
        limits.register(ATTACK_KEY, CountAccessLimit::new(max_attackers));
        limits.register(SHOUT_KEY, TimeAccessLimit::new(10.0));
        limits
    }

    #[test]
    fn far_guard_patrols() {
        let mut tree = guard_tree(TreeConfig::default().with_seed(1)).unwrap();
        let mut guard = Guard::new(0, 0.0);
        guard.player = 50.0;
        let mut limits = limits(1);

        assert_eq!(
            tree.force_update(&mut guard, &mut limits, 0.0),
            Ok(BehaviorResult::Success)
        );
        assert_eq!(guard.hits, 0);
        assert_eq!(guard.shouts, 0);
    }

    #[test]
    fn guard_in_reach_swings_until_hit() {
        let mut tree = guard_tree(TreeConfig::default().with_seed(1)).unwrap();
        let mut guard = Guard::new(0, 0.0);
        guard.player = 0.5;
        let mut limits = limits(1);

        for step in 1..SWING_STEPS {
            assert_eq!(
                tree.force_update(&mut guard, &mut limits, f64::from(step)),
                Ok(BehaviorResult::Running)
            );
        }
        assert_eq!(
            tree.force_update(&mut guard, &mut limits, f64::from(SWING_STEPS)),
            Ok(BehaviorResult::Success)
        );
        assert_eq!(guard.hits, 1);
    }

    #[test]
    fn guard_out_of_reach_shouts_once_then_chases() {
        let mut tree = guard_tree(TreeConfig::default().with_seed(1)).unwrap();
        let mut guard = Guard::new(0, 0.0);
        guard.player = 3.0;
        let mut limits = limits(1);

        // Alarm succeeds first, then the shout cooldown hands over to Chase.
        assert_eq!(
            tree.force_update(&mut guard, &mut limits, 0.0),
            Ok(BehaviorResult::Success)
        );
        assert_eq!(guard.shouts, 1);
        assert_eq!(
            tree.force_update(&mut guard, &mut limits, 0.1),
            Ok(BehaviorResult::Running)
        );
        assert!(guard.position > 0.0);
    }

    #[test]
    fn player_leaving_interrupts_swing() {
        let mut tree = guard_tree(TreeConfig::default().with_seed(1)).unwrap();
        let mut guard = Guard::new(0, 0.0);
        guard.player = 0.5;
        let mut limits = limits(1);

        tree.force_update(&mut guard, &mut limits, 0.0).unwrap();
        assert_eq!(guard.swing_progress, 1);

        guard.player = 4.0;
        tree.force_update(&mut guard, &mut limits, 0.1).unwrap();
        assert_eq!(guard.interrupted_swings, 1);
        assert_eq!(guard.swing_progress, 0);
    }
}
