//! Process-local degradation tracker.
//!
//! Call sites report outcomes with [`DegradationTracker::record_success`] and
//! [`DegradationTracker::record_failure`]; code that wants to choose an
//! execution strategy before calling out asks for the current [`Level`] or
//! dispatches through [`DegradationTracker::execute`].
//!
//! Trackers are ordinary values. Construct one per dependency you want to
//! track and pass it (usually in an `Arc`) to whoever needs it.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use tokio::sync::watch;

use lifeline_core::{
    ConfigError, DegradationConfig, DegradationSnapshot, DegradationState, FallbackError, Level,
    Transition,
};

use crate::operation::{BoxOperation, Operation};

/// Level-specific handlers for [`DegradationTracker::execute`].
///
/// ```rust,ignore
/// let handlers = DegradationHandlers::new()
///     .on(Level::Normal, || async { provider.full_itinerary(trip).await })
///     .on(Level::Minimal, || async { provider.summary(trip).await })
///     .on(Level::Offline, || async { Ok(Itinerary::cached(trip)) });
/// ```
pub struct DegradationHandlers<T, E> {
    handlers: BTreeMap<Level, BoxOperation<T, E>>,
}

impl<T, E> Default for DegradationHandlers<T, E> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<T, E> DegradationHandlers<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `level`, replacing any previous one.
    pub fn on<O>(mut self, level: Level, operation: O) -> Self
    where
        O: Operation<T, E> + 'static,
    {
        self.handlers.insert(level, Box::new(operation));
        self
    }

    /// Whether a handler is registered for exactly `level`.
    pub fn has(&self, level: Level) -> bool {
        self.handlers.contains_key(&level)
    }

    /// Levels that have a handler, least severe first.
    pub fn levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.handlers.keys().copied()
    }

    /// The handler serving `level`: the one registered for it, or else the
    /// least degraded one registered for a more severe level.
    pub fn select(&self, level: Level) -> Option<(Level, &dyn Operation<T, E>)> {
        level
            .cascade()
            .find_map(|candidate| {
                self.handlers
                    .get(&candidate)
                    .map(|handler| (candidate, handler.as_ref()))
            })
    }
}

/// Tracks failures and successes and derives a degradation [`Level`].
///
/// Counter updates are serialized under one lock so the reported level
/// always matches the counters that produced it.
pub struct DegradationTracker {
    state: Mutex<DegradationState>,
    level_tx: watch::Sender<Level>,
}

impl DegradationTracker {
    /// Create a tracker starting at [`Level::Normal`].
    pub fn new(config: DegradationConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_state(DegradationState::new(config)?))
    }

    fn from_state(state: DegradationState) -> Self {
        let (level_tx, _) = watch::channel(state.level());
        Self {
            state: Mutex::new(state),
            level_tx,
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) -> Transition {
        let mut state = self.state.lock();
        let transition = state.record_failure();
        if transition.changed() {
            tracing::warn!(
                from = %transition.from,
                to = %transition.to,
                failures = state.failure_count(),
                "Degradation level worsened"
            );
            self.level_tx.send_replace(transition.to);
        }
        transition
    }

    /// Record a successful call.
    pub fn record_success(&self) -> Transition {
        let mut state = self.state.lock();
        let transition = state.record_success();
        if transition.changed() {
            tracing::info!(
                from = %transition.from,
                to = %transition.to,
                "Recovered to normal after consecutive successes"
            );
            self.level_tx.send_replace(transition.to);
        }
        transition
    }

    /// Current level.
    pub fn level(&self) -> Level {
        self.state.lock().level()
    }

    /// Current level and counters.
    pub fn snapshot(&self) -> DegradationSnapshot {
        self.state.lock().snapshot()
    }

    pub fn config(&self) -> DegradationConfig {
        *self.state.lock().config()
    }

    /// Observe level changes.
    pub fn subscribe(&self) -> watch::Receiver<Level> {
        self.level_tx.subscribe()
    }

    /// Force the tracker back to normal.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let from = state.level();
        state.reset();
        if from != Level::Normal {
            tracing::info!(from = %from, "Degradation tracker reset");
            self.level_tx.send_replace(Level::Normal);
        }
    }

    /// Run the handler that best matches the current level.
    ///
    /// The handler registered for the current level is preferred; without
    /// one, the least degraded handler registered for a more severe level
    /// runs. Handlers for less severe levels are never used: they assume
    /// more capability than the system currently has.
    ///
    /// This does not record the outcome; call sites decide what counts as a
    /// success or failure.
    pub async fn execute<T, E>(
        &self,
        handlers: &DegradationHandlers<T, E>,
    ) -> Result<T, FallbackError<E>> {
        let level = self.level();
        let (selected, handler) = handlers
            .select(level)
            .ok_or(FallbackError::NoHandler { level })?;

        if selected != level {
            tracing::debug!(level = %level, handler = %selected, "No handler for level, cascading");
        }

        handler.run().await.map_err(FallbackError::Operation)
    }
}

impl Default for DegradationTracker {
    fn default() -> Self {
        Self::from_state(DegradationState::default())
    }
}
