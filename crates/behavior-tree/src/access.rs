//! Shared admission gates.
//!
//! An [`AccessLimit`] caps how many decorators, across every tree that shares
//! the registry, may run their child at the same time ("at most two guards
//! attack the player at once"). The registry is owned by the caller and passed
//! into each tick; it is a plain counter and assumes trees are ticked one after
//! another on the same thread.

use std::collections::HashMap;

/// Admission policy behind an access key.
pub trait AccessLimit: Send {
    /// Attempts to take the gate at simulated time `now`. Returns `false` when
    /// the gate is full.
    fn lock(&mut self, now: f64) -> bool;

    /// Releases a previously granted lock.
    fn unlock(&mut self, now: f64);
}

/// At most `max` holders at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountAccessLimit {
    current: u32,
    max: u32,
}

impl CountAccessLimit {
    /// Creates a counter admitting `max` holders (at least one).
    pub fn new(max: u32) -> Self {
        Self {
            current: 0,
            max: max.max(1),
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn set_max(&mut self, max: u32) {
        self.max = max.max(1);
    }
}

impl AccessLimit for CountAccessLimit {
    fn lock(&mut self, _now: f64) -> bool {
        if self.current >= self.max {
            return false;
        }
        self.current += 1;
        true
    }

    fn unlock(&mut self, _now: f64) {
        self.current = self.current.saturating_sub(1);
    }
}

/// One holder at a time, and a new lock only once `interval` seconds have
/// passed since the last unlock.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAccessLimit {
    interval: f64,
    locked: bool,
    ready_at: Option<f64>,
}

impl TimeAccessLimit {
    pub const MIN_INTERVAL: f64 = 0.1;

    /// Creates a limit with the given interval (floored at [`Self::MIN_INTERVAL`]).
    ///
    /// The first lock is granted immediately.
    pub fn new(interval: f64) -> Self {
        Self {
            interval: Self::clamp(interval),
            locked: false,
            ready_at: None,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn set_interval(&mut self, interval: f64) {
        self.interval = Self::clamp(interval);
    }

    fn clamp(interval: f64) -> f64 {
        if interval.is_nan() {
            Self::MIN_INTERVAL
        } else {
            interval.max(Self::MIN_INTERVAL)
        }
    }
}

impl AccessLimit for TimeAccessLimit {
    fn lock(&mut self, now: f64) -> bool {
        if self.locked {
            return false;
        }
        if self.ready_at.is_some_and(|ready_at| now < ready_at) {
            return false;
        }
        self.ready_at = None;
        self.locked = true;
        true
    }

    fn unlock(&mut self, now: f64) {
        if self.locked {
            self.locked = false;
            self.ready_at = Some(now + self.interval);
        }
    }
}

/// Caller-owned mapping from access key to limit.
#[derive(Default)]
pub struct AccessLimitRegistry {
    limits: HashMap<String, Box<dyn AccessLimit>>,
}

impl AccessLimitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `limit` under `key`, returning the limit it replaces.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        limit: impl AccessLimit + 'static,
    ) -> Option<Box<dyn AccessLimit>> {
        let key = key.into();
        tracing::debug!("registering access limit `{}`", key);
        self.limits.insert(key, Box::new(limit))
    }

    pub fn unregister(&mut self, key: &str) -> Option<Box<dyn AccessLimit>> {
        self.limits.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.limits.contains_key(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut (dyn AccessLimit + 'static)> {
        self.limits.get_mut(key).map(|limit| limit.as_mut())
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.limits.keys().map(String::as_str)
    }
}

impl core::fmt::Debug for AccessLimitRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessLimitRegistry")
            .field("keys", &self.limits.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_refuses_third_holder() {
        let mut limit = CountAccessLimit::new(2);
        assert!(limit.lock(0.0));
        assert!(limit.lock(0.0));
        assert!(!limit.lock(0.0));

        limit.unlock(0.0);
        assert_eq!(limit.current(), 1);
        assert!(limit.lock(0.0));
    }

    #[test]
    fn counter_unlock_floors_at_zero() {
        let mut limit = CountAccessLimit::new(1);
        limit.unlock(0.0);
        limit.unlock(0.0);
        assert_eq!(limit.current(), 0);
        assert!(limit.lock(0.0));
    }

    #[test]
    fn counter_admits_at_least_one() {
        assert_eq!(CountAccessLimit::new(0).max(), 1);
    }

    #[test]
    fn time_limit_waits_for_interval_after_unlock() {
        let mut limit = TimeAccessLimit::new(1.0);
        assert!(limit.lock(0.0));
        assert!(!limit.lock(0.1));

        limit.unlock(0.5);
        assert!(!limit.lock(1.0));
        assert!(limit.lock(1.5));
    }

    #[test]
    fn time_limit_interval_has_floor() {
        assert_eq!(TimeAccessLimit::new(0.0).interval(), TimeAccessLimit::MIN_INTERVAL);
    }

    #[test]
    fn registry_register_and_unregister() {
        let mut registry = AccessLimitRegistry::new();
        assert!(registry.register("attack", CountAccessLimit::new(2)).is_none());
        assert!(registry.contains("attack"));

        let limit = registry.get_mut("attack").expect("registered");
        assert!(limit.lock(0.0));

        assert!(registry.unregister("attack").is_some());
        assert!(registry.get_mut("attack").is_none());
    }
}
