//! Simulation settings.
use std::env;

use behavior_tree::TreeConfig;

/// Crowd simulation configuration.
///
/// Tree tunables come from the `BT_*` variables (see [`TreeConfig::from_env`]).
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Number of guards, one tree each.
    pub guards: usize,
    /// Number of simulation steps.
    pub steps: u32,
    /// Simulated seconds per step.
    pub time_step: f64,
    /// Guards allowed to attack the player at the same time.
    pub max_attackers: u32,
    /// Seconds between two alarm shouts, crowd-wide.
    pub shout_interval: f64,
    pub tree: TreeConfig,
}

impl SimConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SIM_GUARDS` - number of guards (default: 4)
    /// - `SIM_STEPS` - simulation steps (default: 120)
    /// - `SIM_TIME_STEP` - seconds per step (default: 0.1)
    /// - `SIM_MAX_ATTACKERS` - simultaneous attackers (default: 2)
    /// - `SIM_SHOUT_INTERVAL` - seconds between shouts (default: 1.5)
    pub fn from_env() -> Self {
        let mut config = Self {
            tree: TreeConfig::from_env(),
            ..Self::default()
        };

        if let Some(guards) = read_env::<usize>("SIM_GUARDS") {
            config.guards = guards.max(1);
        }
        if let Some(steps) = read_env::<u32>("SIM_STEPS") {
            config.steps = steps;
        }
        if let Some(time_step) = read_env::<f64>("SIM_TIME_STEP")
            && time_step > 0.0
        {
            config.time_step = time_step;
        }
        if let Some(max) = read_env::<u32>("SIM_MAX_ATTACKERS") {
            config.max_attackers = max;
        }
        if let Some(interval) = read_env::<f64>("SIM_SHOUT_INTERVAL") {
            config.shout_interval = interval;
        }

        config
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            guards: 4,
            steps: 120,
            time_step: 0.1,
            max_attackers: 2,
            shout_interval: 1.5,
            tree: TreeConfig::default(),
        }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
