//! Ordered fallback chain.
//!
//! Operations are tried in insertion order until one succeeds. A later
//! operation never runs once an earlier one has succeeded: chains are
//! usually ordered cheapest-first and the expensive tail may have side
//! effects (billing, quota) that must not happen needlessly.

use lifeline_core::{FallbackError, Predicate};

use crate::operation::{BoxOperation, Operation};

struct Step<T, E> {
    name: Option<String>,
    operation: BoxOperation<T, E>,
    predicate: Option<Predicate<E>>,
}

/// Fallback chain - tried in order.
///
/// ```rust,ignore
/// let chain = FallbackChain::new()
///     .add_named("primary", || async { primary.balance(&wallet).await })
///     .add_named("mirror", || async { mirror.balance(&wallet).await })
///     .with_predicate(dont_fallback_on(fallback_on_error_type::<AuthError, _>()))
///     .finally(Balance::unknown());
///
/// let balance = chain.execute().await?;
/// ```
///
/// The chain is reusable: `execute` borrows it, so the same chain can serve
/// many calls.
pub struct FallbackChain<T, E> {
    steps: Vec<Step<T, E>>,
    predicate: Option<Predicate<E>>,
    terminal: Option<T>,
}

impl<T, E> Default for FallbackChain<T, E> {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            predicate: None,
            terminal: None,
        }
    }
}

impl<T, E> FallbackChain<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    /// Create a new, empty fallback chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation to the chain.
    pub fn add<O>(self, operation: O) -> Self
    where
        O: Operation<T, E> + 'static,
    {
        self.push(None, operation, None)
    }

    /// Append an operation with a name used in log events.
    pub fn add_named<O>(self, name: impl Into<String>, operation: O) -> Self
    where
        O: Operation<T, E> + 'static,
    {
        self.push(Some(name.into()), operation, None)
    }

    /// Append an operation whose failures only advance the chain when
    /// `predicate` accepts them. This overrides the chain-wide predicate for
    /// this step.
    pub fn add_guarded<O>(self, operation: O, predicate: Predicate<E>) -> Self
    where
        O: Operation<T, E> + 'static,
    {
        self.push(None, operation, Some(predicate))
    }

    /// Only advance past a failed operation when `predicate` accepts its
    /// error; otherwise return that error immediately.
    pub fn with_predicate(mut self, predicate: Predicate<E>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Value returned when every operation has failed.
    pub fn finally(mut self, value: T) -> Self {
        self.terminal = Some(value);
        self
    }

    fn push<O>(mut self, name: Option<String>, operation: O, predicate: Option<Predicate<E>>) -> Self
    where
        O: Operation<T, E> + 'static,
    {
        self.steps.push(Step {
            name,
            operation: Box::new(operation),
            predicate,
        });
        self
    }

    /// Number of operations in the chain.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no operation has been added.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether a terminal value was installed with [`FallbackChain::finally`].
    pub fn has_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Run the chain.
    ///
    /// Returns the first successful result. If every operation fails, the
    /// terminal value is returned when present, otherwise the error of the
    /// last operation that ran. An error rejected by the governing predicate
    /// is returned at once without trying the rest.
    ///
    /// An empty chain without a terminal value fails with
    /// [`FallbackError::NoOperations`].
    pub async fn execute(&self) -> Result<T, FallbackError<E>> {
        let mut last_error: Option<E> = None;

        for (index, step) in self.steps.iter().enumerate() {
            let label = step.name.as_deref().unwrap_or("<unnamed>");

            match step.operation.run().await {
                Ok(value) => {
                    if index > 0 {
                        tracing::debug!(step = index, operation = label, "Fallback operation succeeded");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let recoverable = step
                        .predicate
                        .as_ref()
                        .or(self.predicate.as_ref())
                        .map_or(true, |predicate| predicate(&err));

                    if !recoverable {
                        tracing::debug!(
                            step = index,
                            operation = label,
                            "Operation failed with non-recoverable error, aborting chain"
                        );
                        return Err(FallbackError::Operation(err));
                    }

                    tracing::debug!(step = index, operation = label, "Operation failed, trying next");
                    last_error = Some(err);
                }
            }
        }

        if let Some(value) = &self.terminal {
            tracing::debug!(operations = self.steps.len(), "All operations failed, using terminal value");
            return Ok(value.clone());
        }

        match last_error {
            Some(err) => {
                tracing::warn!(operations = self.steps.len(), "All fallbacks exhausted");
                Err(FallbackError::Operation(err))
            }
            None => Err(FallbackError::NoOperations),
        }
    }
}
