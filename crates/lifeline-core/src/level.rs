//! Degradation levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How capable the system currently is, ordered by increasing severity.
///
/// `Normal < Degraded < Minimal < Offline`, so levels can be compared
/// directly (`level >= Level::Minimal`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Full-fidelity operation
    Normal,

    /// Some upstream calls are failing
    Degraded,

    /// Only essential functionality should run
    Minimal,

    /// Upstream considered unreachable
    Offline,
}

impl Level {
    /// All levels from least to most severe.
    pub const ALL: [Level; 4] = [Level::Normal, Level::Degraded, Level::Minimal, Level::Offline];

    /// Lowercase name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Normal => "normal",
            Level::Degraded => "degraded",
            Level::Minimal => "minimal",
            Level::Offline => "offline",
        }
    }

    /// The next more severe level, if any.
    pub fn more_severe(self) -> Option<Level> {
        match self {
            Level::Normal => Some(Level::Degraded),
            Level::Degraded => Some(Level::Minimal),
            Level::Minimal => Some(Level::Offline),
            Level::Offline => None,
        }
    }

    /// This level followed by every more severe level.
    ///
    /// This is the order in which handlers are looked up when dispatching
    /// on a level: the matching handler first, then progressively more
    /// degraded ones.
    pub fn cascade(self) -> impl Iterator<Item = Level> {
        std::iter::successors(Some(self), |level| level.more_severe())
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown degradation level: '{0}'")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Level::Normal),
            "degraded" => Ok(Level::Degraded),
            "minimal" => Ok(Level::Minimal),
            "offline" => Ok(Level::Offline),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(Level::Normal < Level::Degraded);
        assert!(Level::Degraded < Level::Minimal);
        assert!(Level::Minimal < Level::Offline);
    }

    #[test]
    fn test_cascade_walks_towards_offline() {
        let from_degraded: Vec<_> = Level::Degraded.cascade().collect();
        assert_eq!(
            from_degraded,
            vec![Level::Degraded, Level::Minimal, Level::Offline]
        );

        let from_offline: Vec<_> = Level::Offline.cascade().collect();
        assert_eq!(from_offline, vec![Level::Offline]);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Minimal".parse::<Level>().unwrap(), Level::Minimal);
        assert_eq!(Level::Offline.to_string(), "offline");
        assert!("broken".parse::<Level>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Level::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
        let level: Level = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(level, Level::Offline);
    }
}
