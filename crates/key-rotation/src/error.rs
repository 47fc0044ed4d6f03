//! Error types for resilient invocation

/// Final failure of a resilient call.
///
/// `E` is the operation's own error type; `Backend` returns it unmodified.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// Quota exhausted and there is no other key to rotate to.
    #[error("daily usage limit reached, please try again tomorrow")]
    DailyLimitReached,

    /// Attempt budget spent without a success.
    #[error("{description} failed after several attempts")]
    AttemptsExhausted { description: String, attempts: usize },

    /// Non-retryable failure from the operation itself.
    #[error(transparent)]
    Backend(E),
}

impl<E> Error<E> {
    /// Short label for metrics and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DailyLimitReached => "daily_limit",
            Error::AttemptsExhausted { .. } => "attempts_exhausted",
            Error::Backend(_) => "backend",
        }
    }

    /// The operation's error, if this failure was a pass-through.
    pub fn into_backend(self) -> Option<E> {
        match self {
            Error::Backend(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias for resilient calls.
pub type Result<T, E> = std::result::Result<T, Error<E>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom: {0}")]
    struct Boom(&'static str);

    #[test]
    fn attempts_exhausted_mentions_description() {
        let err: Error<Boom> = Error::AttemptsExhausted {
            description: "Solving Quiz".into(),
            attempts: 3,
        };
        assert_eq!(err.to_string(), "Solving Quiz failed after several attempts");
        assert_eq!(err.kind(), "attempts_exhausted");
    }

    #[test]
    fn backend_is_transparent() {
        let err = Error::Backend(Boom("bad request"));
        assert_eq!(err.to_string(), "boom: bad request");
        assert_eq!(err.kind(), "backend");
        assert_eq!(err.into_backend().unwrap().0, "bad request");
    }

    #[test]
    fn daily_limit_has_no_backend() {
        let err: Error<Boom> = Error::DailyLimitReached;
        assert!(err.to_string().contains("try again tomorrow"));
        assert!(err.into_backend().is_none());
    }
}
