//! The unit of work every primitive wraps.

use async_trait::async_trait;
use std::future::Future;

/// A zero-argument, repeatable unit of work that produces a `T` or fails
/// with an `E`.
///
/// Closures returning a future implement this automatically, so most
/// callers never name the trait:
///
/// ```rust,ignore
/// chain.add(|| async { provider.fetch_balance().await });
/// ```
///
/// Implement it by hand for provider clients that carry their own state.
///
/// # Idempotency
/// The toolkit makes no idempotency assumptions. An operation placed in a
/// chain may be skipped entirely, and one wrapped by a cache may not run at
/// all on a hit; guard side effects at the call site.
#[async_trait]
pub trait Operation<T, E>: Send + Sync {
    /// Run the operation once.
    async fn run(&self) -> Result<T, E>;
}

#[async_trait]
impl<T, E, F, Fut> Operation<T, E> for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    async fn run(&self) -> Result<T, E> {
        (self)().await
    }
}

/// Boxed operation, as stored by chains and handler tables.
pub type BoxOperation<T, E> = Box<dyn Operation<T, E>>;
