//! # lifeline-runtime
//!
//! Async resilience primitives for calls to unreliable providers.
//!
//! - [`with_fallback`]: run a primary future, resolve a failure once through
//!   a substitute
//! - [`FallbackChain`]: try operations in order until one succeeds
//! - [`FallbackCache`]: TTL cache that can serve stale values when a refresh
//!   fails, with concurrent misses coalesced into one fetch
//! - [`DegradationTracker`]: derive a degradation [`Level`] from reported
//!   outcomes and dispatch to level-specific handlers
//!
//! The components do not depend on each other; compose them at the call
//! site. None of them spawns tasks or threads.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lifeline_runtime::{CacheConfig, DegradationTracker, FallbackCache, FallbackChain};
//!
//! let tracker = Arc::new(DegradationTracker::default());
//! let cache = FallbackCache::new(CacheConfig::new(Duration::from_secs(300)).stale_while_revalidate(true))?;
//!
//! let quote = cache
//!     .get_or_fetch("EURUSD", || async {
//!         let result = FallbackChain::new()
//!             .add(|| async { primary.quote("EURUSD").await })
//!             .add(|| async { secondary.quote("EURUSD").await })
//!             .execute()
//!             .await;
//!         match &result {
//!             Ok(_) => tracker.record_success(),
//!             Err(_) => tracker.record_failure(),
//!         };
//!         result
//!     })
//!     .await?;
//! ```

pub mod cache;
pub mod chain;
pub mod degradation;
pub mod operation;
pub mod wrapper;

pub use cache::{CacheStats, CachedValue, FallbackCache};
pub use chain::FallbackChain;
pub use degradation::{DegradationHandlers, DegradationTracker};
pub use operation::{BoxOperation, Operation};
pub use wrapper::{with_fallback, with_fallback_if, with_fallback_value};

pub use lifeline_core::{
    predicate, CacheConfig, ConfigError, DegradationConfig, DegradationSnapshot, FallbackError,
    Level, LifelineConfig, Predicate, Thresholds, Transition,
};
