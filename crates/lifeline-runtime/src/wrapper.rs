//! Single-shot fallback wrapper.
//!
//! Await a primary future; if it fails, resolve the failure once through a
//! substitute. The substitute is never touched on the happy path, and a
//! failing substitute is not retried: its error goes straight to the caller.

use std::future::Future;

use lifeline_core::Predicate;

/// Run `primary`; on failure, hand the error to `fallback` and return its
/// result instead.
///
/// ```rust,ignore
/// let recipe = with_fallback(primary_api.recipe(id), |err| async move {
///     tracing::warn!(error = %err, "primary recipe API failed");
///     mirror_api.recipe(id).await
/// })
/// .await?;
/// ```
pub async fn with_fallback<T, E, P, F, Fut>(primary: P, fallback: F) -> Result<T, E>
where
    P: Future<Output = Result<T, E>>,
    F: FnOnce(E) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match primary.await {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::debug!("Primary operation failed, running fallback");
            fallback(err).await
        }
    }
}

/// Run `primary`; on failure, return `value` instead of the error.
pub async fn with_fallback_value<T, E, P>(primary: P, value: T) -> Result<T, E>
where
    P: Future<Output = Result<T, E>>,
{
    match primary.await {
        Ok(result) => Ok(result),
        Err(_) => {
            tracing::debug!("Primary operation failed, using static fallback value");
            Ok(value)
        }
    }
}

/// Like [`with_fallback`], but only errors accepted by `predicate` are
/// handed to the fallback. Rejected errors are returned unchanged.
pub async fn with_fallback_if<T, E, P, F, Fut>(
    primary: P,
    predicate: &Predicate<E>,
    fallback: F,
) -> Result<T, E>
where
    P: Future<Output = Result<T, E>>,
    F: FnOnce(E) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match primary.await {
        Ok(value) => Ok(value),
        Err(err) if predicate(&err) => {
            tracing::debug!("Primary operation failed, running fallback");
            fallback(err).await
        }
        Err(err) => {
            tracing::debug!("Primary error is not recoverable, skipping fallback");
            Err(err)
        }
    }
}
