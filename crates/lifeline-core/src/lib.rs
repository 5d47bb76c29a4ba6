//! # lifeline-core
//!
//! Deterministic building blocks for the lifeline resilience toolkit.
//!
//! This crate holds everything that does not need an async runtime:
//! - [`Level`] and the [`DegradationState`] machine that derives it from
//!   failure counts
//! - error [`predicate`]s deciding whether a failure should trigger fallback
//! - configuration types, loadable from YAML/JSON
//! - the shared error taxonomy
//!
//! The async primitives (fallback wrapper, chain, cache, tracker) live in
//! `lifeline-runtime`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lifeline_core::{DegradationConfig, DegradationState, Level, Thresholds};
//!
//! let config = DegradationConfig::new(Thresholds::new(2, 5, 10), 2);
//! let mut state = DegradationState::new(config)?;
//!
//! state.record_failure();
//! state.record_failure();
//! assert_eq!(state.level(), Level::Degraded);
//! ```

pub mod config;
pub mod degradation;
pub mod error;
pub mod level;
pub mod predicate;

// Re-export main types at crate root
pub use config::{CacheConfig, DegradationConfig, LifelineConfig, Thresholds};
pub use degradation::{DegradationSnapshot, DegradationState, Transition};
pub use error::{ConfigError, FallbackError};
pub use level::{Level, ParseLevelError};
pub use predicate::{AsDynError, Predicate};
