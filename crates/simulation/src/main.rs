//! Headless guard crowd simulation.
//!
//! Spawns a row of guards, one behavior tree each, and moves a player back and
//! forth past them. All trees share one access-limit registry, so only
//! `SIM_MAX_ATTACKERS` guards swing in the same tick and alarm shouts are
//! spaced `SIM_SHOUT_INTERVAL` seconds apart.
//!
//! ```bash
//! RUST_LOG=bt_sim=debug,behavior_tree=debug SIM_GUARDS=6 cargo run -p bt-sim
//! ```
mod agent;
mod config;

use anyhow::{Context, Result};
use behavior_tree::{AccessLimitRegistry, CountAccessLimit, TickStatus, TimeAccessLimit};

use crate::agent::{ATTACK_KEY, Guard, SHOUT_KEY, guard_tree};
use crate::config::SimConfig;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SimConfig::from_env();
    config.tree.validate().context("invalid tree configuration")?;
    tracing::info!("Starting simulation: {:?}", config);

    let mut limits = AccessLimitRegistry::new();
    limits.register(ATTACK_KEY, CountAccessLimit::new(config.max_attackers));
    limits.register(SHOUT_KEY, TimeAccessLimit::new(config.shout_interval));

    let mut crowd = Vec::with_capacity(config.guards);
    for id in 0..config.guards {
        let mut tree_config = config.tree.clone();
        // Distinct but reproducible patrol rolls per guard.
        tree_config.seed = tree_config.seed.map(|seed| seed.wrapping_add(id as u64));
        let tree = guard_tree(tree_config).with_context(|| format!("building tree for guard {id}"))?;
        crowd.push((Guard::new(id, id as f64 * 3.0), tree));
    }

    let span = config.guards as f64 * 3.0;
    let mut skipped = 0u32;
    for step in 0..config.steps {
        let now = f64::from(step) * config.time_step;
        let player = span * 0.5 * (1.0 + (now * 0.4).sin());

        for (guard, tree) in &mut crowd {
            guard.player = player;
            match tree
                .update(guard, &mut limits, now)
                .with_context(|| format!("guard {} at t={now:.2}", guard.id))?
            {
                TickStatus::Skipped => skipped += 1,
                TickStatus::RunningActionsUpdated => {}
                TickStatus::Ticked(result) => {
                    tracing::trace!("guard {} -> {}", guard.id, result);
                }
            }
        }
        if let Some((_, tree)) = crowd.first() {
            tree.log_execution_sequence();
        }
    }

    for (guard, tree) in &crowd {
        tracing::info!(
            "guard {}: {} hits, {} interrupted swings, {} shouts, {} ticks",
            guard.id,
            guard.hits,
            guard.interrupted_swings,
            guard.shouts,
            tree.state().update_id()
        );
    }
    tracing::info!("{} tree updates skipped by the update interval", skipped);
    Ok(())
}
