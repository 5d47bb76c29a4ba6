//! Degradation state machine.
//!
//! Failures accumulate into a count that is mapped onto a [`Level`] through
//! [`Thresholds`]. Recovery is all-or-nothing: once enough consecutive
//! successes are seen the state resets to [`Level::Normal`]; a partial
//! streak leaves the level where it is.
//!
//! This type is plain data with no locking. The runtime crate wraps it in a
//! mutex to share it between tasks.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DegradationConfig, Level};

/// A level change (or non-change) produced by recording an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: Level,
    pub to: Level,
}

impl Transition {
    /// Whether the level actually changed.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    /// True when the new level is more severe than the old one.
    pub fn is_worsening(&self) -> bool {
        self.to > self.from
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradationSnapshot {
    pub level: Level,
    pub failure_count: u32,
    pub consecutive_successes: u32,
}

/// Failure/success bookkeeping for one tracker.
#[derive(Debug, Clone)]
pub struct DegradationState {
    config: DegradationConfig,
    level: Level,
    failure_count: u32,
    consecutive_successes: u32,
}

impl DegradationState {
    /// Create a state at [`Level::Normal`] after validating the config.
    pub fn new(config: DegradationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            level: Level::Normal,
            failure_count: 0,
            consecutive_successes: 0,
        })
    }

    /// Record a failed call.
    pub fn record_failure(&mut self) -> Transition {
        let from = self.level;
        self.failure_count = self.failure_count.saturating_add(1);
        self.consecutive_successes = 0;
        self.level = self.config.thresholds.level_for(self.failure_count);
        Transition {
            from,
            to: self.level,
        }
    }

    /// Record a successful call.
    pub fn record_success(&mut self) -> Transition {
        let from = self.level;
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        if self.consecutive_successes >= self.config.recovery_threshold {
            self.reset();
        }
        Transition {
            from,
            to: self.level,
        }
    }

    /// Return to normal and clear both counters.
    pub fn reset(&mut self) {
        self.failure_count = 0;
        self.consecutive_successes = 0;
        self.level = Level::Normal;
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn config(&self) -> &DegradationConfig {
        &self.config
    }

    pub fn snapshot(&self) -> DegradationSnapshot {
        DegradationSnapshot {
            level: self.level,
            failure_count: self.failure_count,
            consecutive_successes: self.consecutive_successes,
        }
    }
}

impl Default for DegradationState {
    fn default() -> Self {
        Self {
            config: DegradationConfig::default(),
            level: Level::Normal,
            failure_count: 0,
            consecutive_successes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Thresholds;
    use proptest::prelude::*;

    fn state(degraded: u32, minimal: u32, offline: u32, recovery: u32) -> DegradationState {
        DegradationState::new(DegradationConfig::new(
            Thresholds::new(degraded, minimal, offline),
            recovery,
        ))
        .unwrap()
    }

    #[test]
    fn test_starts_normal() {
        let s = state(2, 5, 10, 2);
        assert_eq!(s.level(), Level::Normal);
        assert_eq!(s.failure_count(), 0);
        assert_eq!(s.consecutive_successes(), 0);
    }

    #[test]
    fn test_two_failures_degrade() {
        let mut s = state(2, 5, 10, 2);
        assert!(!s.record_failure().changed());
        let t = s.record_failure();
        assert_eq!(t, Transition { from: Level::Normal, to: Level::Degraded });
        assert!(t.is_worsening());
        assert_eq!(s.level(), Level::Degraded);
    }

    #[test]
    fn test_failures_walk_through_every_level() {
        let mut s = state(2, 5, 10, 2);
        for _ in 0..5 {
            s.record_failure();
        }
        assert_eq!(s.level(), Level::Minimal);
        for _ in 0..5 {
            s.record_failure();
        }
        assert_eq!(s.level(), Level::Offline);
    }

    #[test]
    fn test_recovery_is_all_or_nothing() {
        let mut s = state(2, 5, 10, 2);
        for _ in 0..6 {
            s.record_failure();
        }
        assert_eq!(s.level(), Level::Minimal);

        // One success is not enough and does not step down a level
        assert!(!s.record_success().changed());
        assert_eq!(s.level(), Level::Minimal);
        assert_eq!(s.failure_count(), 6);

        let t = s.record_success();
        assert_eq!(t, Transition { from: Level::Minimal, to: Level::Normal });
        assert_eq!(s.failure_count(), 0);
        assert_eq!(s.consecutive_successes(), 0);
    }

    #[test]
    fn test_degraded_to_normal_directly() {
        let mut s = state(2, 5, 10, 2);
        s.record_failure();
        s.record_failure();
        s.record_success();
        s.record_success();
        assert_eq!(s.level(), Level::Normal);
    }

    #[test]
    fn test_failure_breaks_success_streak() {
        let mut s = state(2, 5, 10, 2);
        s.record_failure();
        s.record_failure();
        s.record_success();
        s.record_failure();
        assert_eq!(s.consecutive_successes(), 0);
        s.record_success();
        assert_eq!(s.level(), Level::Degraded);
        assert_eq!(s.failure_count(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = DegradationState::new(DegradationConfig::new(Thresholds::new(3, 2, 10), 1));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    proptest! {
        #[test]
        fn prop_level_always_derived_from_failure_count(
            events in proptest::collection::vec(any::<bool>(), 0..200),
            recovery in 1u32..6,
        ) {
            let mut s = state(2, 5, 10, recovery);
            for failed in events {
                if failed {
                    s.record_failure();
                } else {
                    s.record_success();
                }
                prop_assert_eq!(s.level(), s.config().thresholds.level_for(s.failure_count()));
                prop_assert!(s.consecutive_successes() < recovery);
            }
        }
    }
}
