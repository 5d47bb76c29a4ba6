//! Error taxonomy shared by the lifeline crates.

use thiserror::Error;

use crate::Level;

/// Errors surfaced by fallback chains and degradation dispatch.
///
/// `Operation` carries the caller's own error type unchanged. The other
/// variants are configuration errors: they indicate a programming mistake
/// and are never produced by a correctly wired toolkit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FallbackError<E> {
    /// The operation that ran last failed and nothing was left to try.
    #[error("{0}")]
    Operation(E),

    #[error("fallback chain has no operations configured")]
    NoOperations,

    #[error("no handler for degradation level '{level}'")]
    NoHandler { level: Level },
}

impl<E> FallbackError<E> {
    /// Unwrap the operation error, if this is one.
    pub fn into_operation(self) -> Option<E> {
        match self {
            FallbackError::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow the operation error, if this is one.
    pub fn as_operation(&self) -> Option<&E> {
        match self {
            FallbackError::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// True for misconfiguration errors (empty chain, missing handler).
    pub fn is_configuration(&self) -> bool {
        !matches!(self, FallbackError::Operation(_))
    }
}

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_displays_inner() {
        let err: FallbackError<String> = FallbackError::Operation("upstream timeout".into());
        assert_eq!(err.to_string(), "upstream timeout");
        assert!(!err.is_configuration());
        assert_eq!(err.into_operation().as_deref(), Some("upstream timeout"));
    }

    #[test]
    fn test_configuration_errors() {
        let empty: FallbackError<String> = FallbackError::NoOperations;
        assert!(empty.is_configuration());
        assert!(empty.as_operation().is_none());

        let missing: FallbackError<String> = FallbackError::NoHandler {
            level: Level::Minimal,
        };
        assert_eq!(
            missing.to_string(),
            "no handler for degradation level 'minimal'"
        );
    }
}
