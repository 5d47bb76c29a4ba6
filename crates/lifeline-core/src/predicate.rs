//! Predicates deciding whether an error should trigger fallback.
//!
//! A predicate returning `true` means "this error is recoverable, try the
//! fallback". Returning `false` means the error is passed straight back to
//! the caller, bypassing any remaining fallbacks.
//!
//! ```rust,ignore
//! use lifeline_core::predicate::*;
//!
//! // Fall back on network trouble, but never on auth failures.
//! let on_network = fallback_on_message_pattern("(?i)network")?;
//! let not_auth = dont_fallback_on(fallback_on_error_type::<AuthError, anyhow::Error>());
//! let predicate = all_of(vec![on_network, not_auth]);
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use std::error::Error as StdError;
use std::fmt::Display;
use std::sync::Arc;

/// Shared, thread-safe error predicate.
pub type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

lazy_static! {
    /// Messages that usually describe a transient upstream failure.
    static ref TRANSIENT_PATTERN: Regex = Regex::new(
        r"(?i)(time[d\s-]*out|connection (reset|refused|closed|aborted)|broken pipe|network|temporar(il)?y unavailable|service unavailable|too many requests|rate limit|\b(429|502|503|504)\b)"
    ).unwrap();
}

/// View an error value as a `dyn std::error::Error` so it can be downcast.
///
/// Implemented for the boxed/erased error types that can carry errors of
/// several concrete categories.
pub trait AsDynError {
    fn as_dyn_error(&self) -> &(dyn StdError + 'static);
}

impl AsDynError for anyhow::Error {
    fn as_dyn_error(&self) -> &(dyn StdError + 'static) {
        <anyhow::Error as AsRef<dyn StdError + 'static>>::as_ref(self)
    }
}

impl AsDynError for Box<dyn StdError + Send + Sync> {
    fn as_dyn_error(&self) -> &(dyn StdError + 'static) {
        &**self
    }
}

impl AsDynError for Box<dyn StdError> {
    fn as_dyn_error(&self) -> &(dyn StdError + 'static) {
        &**self
    }
}

/// Wrap a closure as a [`Predicate`].
pub fn predicate<E, F>(f: F) -> Predicate<E>
where
    E: 'static,
    F: Fn(&E) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Fall back on every error.
pub fn fallback_on_any<E: 'static>() -> Predicate<E> {
    Arc::new(|_: &E| true)
}

/// Fall back only when the error, or any error in its `source()` chain, is
/// of the concrete type `C`.
///
/// Walking the chain keeps the match working after an error has been
/// wrapped with context.
pub fn fallback_on_error_type<C, E>() -> Predicate<E>
where
    C: StdError + 'static,
    E: AsDynError + 'static,
{
    Arc::new(|err: &E| {
        std::iter::successors(Some(err.as_dyn_error()), |e: &&(dyn StdError + 'static)| (*e).source()).any(|e| e.is::<C>())
    })
}

/// Fall back only when the error's message matches `pattern`.
///
/// Case-insensitive matching is expressed in the pattern itself, e.g.
/// `(?i)network`.
pub fn fallback_on_message<E>(pattern: Regex) -> Predicate<E>
where
    E: Display + 'static,
{
    Arc::new(move |err: &E| pattern.is_match(&err.to_string()))
}

/// Like [`fallback_on_message`], compiling the pattern first.
pub fn fallback_on_message_pattern<E>(pattern: &str) -> Result<Predicate<E>, regex::Error>
where
    E: Display + 'static,
{
    Ok(fallback_on_message(Regex::new(pattern)?))
}

/// Fall back on errors whose message looks transient (timeouts, refused or
/// reset connections, 429/502/503/504, rate limiting).
pub fn fallback_on_transient<E>() -> Predicate<E>
where
    E: Display + 'static,
{
    fallback_on_message((*TRANSIENT_PATTERN).clone())
}

/// Negate a predicate: errors it matches are treated as non-recoverable.
pub fn dont_fallback_on<E>(inner: Predicate<E>) -> Predicate<E>
where
    E: 'static,
{
    Arc::new(move |err: &E| !inner(err))
}

/// True when any predicate matches. An empty list never matches.
pub fn any_of<E>(predicates: Vec<Predicate<E>>) -> Predicate<E>
where
    E: 'static,
{
    Arc::new(move |err: &E| predicates.iter().any(|p| p(err)))
}

/// True when every predicate matches. An empty list always matches.
pub fn all_of<E>(predicates: Vec<Predicate<E>>) -> Predicate<E>
where
    E: 'static,
{
    Arc::new(move |err: &E| predicates.iter().all(|p| p(err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fmt;

    #[derive(Debug)]
    struct AuthError;

    impl fmt::Display for AuthError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("authentication failed")
        }
    }

    impl StdError for AuthError {}

    #[derive(Debug)]
    struct NetworkError(String);

    impl fmt::Display for NetworkError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "network: {}", self.0)
        }
    }

    impl StdError for NetworkError {}

    #[test]
    fn test_fallback_on_any() {
        let p = fallback_on_any::<String>();
        assert!(p(&"anything".to_string()));
    }

    #[test]
    fn test_error_type_matches_only_that_type() {
        let p = fallback_on_error_type::<AuthError, anyhow::Error>();
        assert!(p(&anyhow::Error::new(AuthError)));
        assert!(!p(&anyhow::Error::new(NetworkError("down".into()))));
        assert!(!p(&anyhow::anyhow!("authentication failed")));
    }

    #[test]
    fn test_error_type_matches_through_context() {
        use anyhow::Context;

        let p = fallback_on_error_type::<AuthError, anyhow::Error>();
        let wrapped = Err::<(), _>(AuthError)
            .context("fetching balance")
            .unwrap_err();
        assert!(p(&wrapped));

        let twice = wrapped.context("refreshing dashboard");
        assert!(p(&twice));

        let not_auth = dont_fallback_on(fallback_on_error_type::<AuthError, anyhow::Error>());
        assert!(!not_auth(&twice));
        assert!(not_auth(
            &Err::<(), _>(NetworkError("reset".into()))
                .context("fetching balance")
                .unwrap_err()
        ));
    }

    #[test]
    fn test_error_type_on_boxed_errors() {
        let p = fallback_on_error_type::<NetworkError, Box<dyn StdError + Send + Sync>>();
        let net: Box<dyn StdError + Send + Sync> = Box::new(NetworkError("reset".into()));
        let auth: Box<dyn StdError + Send + Sync> = Box::new(AuthError);
        assert!(p(&net));
        assert!(!p(&auth));
    }

    #[test]
    fn test_message_is_case_insensitive_with_flag() {
        let p = fallback_on_message_pattern::<String>("(?i)network").unwrap();
        assert!(p(&"NETWORK unreachable".to_string()));
        assert!(p(&"Network error".to_string()));
        assert!(!p(&"invalid input".to_string()));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(fallback_on_message_pattern::<String>("(unclosed").is_err());
    }

    #[test]
    fn test_dont_fallback_on_negates() {
        let auth = fallback_on_error_type::<AuthError, anyhow::Error>();
        let p = dont_fallback_on(auth);
        assert!(!p(&anyhow::Error::new(AuthError)));
        assert!(p(&anyhow::Error::new(NetworkError("down".into()))));
    }

    #[test]
    fn test_transient_pattern() {
        let p = fallback_on_transient::<String>();
        for msg in [
            "request timed out",
            "Connection refused",
            "HTTP 503 Service Unavailable",
            "429 Too Many Requests",
            "operation timeout after 5s",
        ] {
            assert!(p(&msg.to_string()), "expected transient: {msg}");
        }
        assert!(!p(&"401 unauthorized".to_string()));
        assert!(!p(&"invalid recipe id".to_string()));
    }

    #[test]
    fn test_combinators() {
        let net = fallback_on_message_pattern::<String>("(?i)network").unwrap();
        let slow = fallback_on_message_pattern::<String>("slow").unwrap();

        let either = any_of(vec![net.clone(), slow.clone()]);
        let both = all_of(vec![net, slow]);

        assert!(either(&"slow".to_string()));
        assert!(!both(&"slow".to_string()));
        assert!(both(&"slow network".to_string()));
        assert!(!any_of::<String>(vec![])(&"x".to_string()));
        assert!(all_of::<String>(vec![])(&"x".to_string()));
    }

    proptest! {
        #[test]
        fn prop_dont_fallback_on_is_negation(msg in ".*") {
            let p = fallback_on_message_pattern::<String>("(?i)timeout|refused").unwrap();
            let negated = dont_fallback_on(p.clone());
            prop_assert_eq!(negated(&msg), !p(&msg));
        }
    }
}
