//! Result returned by behavior nodes.

/// The outcome of tracing a behavior node for one tick.
///
/// # Tick Semantics
///
/// A tick is one synchronous evaluation of the tree. Nodes that cannot finish
/// within a single tick report [`BehaviorResult::Running`] and are resumed on
/// the next tick, exactly where they left off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BehaviorResult {
    /// The behavior failed.
    ///
    /// For conditions: The condition was not met.
    /// For actions: The action could not be carried out, or its handler raised a fault.
    #[default]
    Failure,

    /// The behavior completed successfully.
    ///
    /// For conditions: The condition was met.
    /// For actions: The action finished.
    Success,

    /// The behavior has not finished yet and must be traced again next tick.
    Running,
}

impl BehaviorResult {
    /// Returns `true` if this result is `Success`.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, BehaviorResult::Success)
    }

    /// Returns `true` if this result is `Failure`.
    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, BehaviorResult::Failure)
    }

    /// Returns `true` if this result is `Running`.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, BehaviorResult::Running)
    }

    /// Swaps `Success` and `Failure`; `Running` is left untouched.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            BehaviorResult::Success => BehaviorResult::Failure,
            BehaviorResult::Failure => BehaviorResult::Success,
            BehaviorResult::Running => BehaviorResult::Running,
        }
    }

    /// Maps a boolean verdict to `Success` or `Failure`.
    #[inline]
    pub fn from_bool(value: bool) -> Self {
        if value {
            BehaviorResult::Success
        } else {
            BehaviorResult::Failure
        }
    }

    /// Short lowercase label used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            BehaviorResult::Failure => "failure",
            BehaviorResult::Success => "success",
            BehaviorResult::Running => "running",
        }
    }
}

impl core::fmt::Display for BehaviorResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
