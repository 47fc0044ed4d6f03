//! API key rotation and retry for generative backend calls
//!
//! Wraps a single backend call so that it survives the two transient failures
//! the backend reports:
//! 1. Quota exhausted (429 / `RESOURCE_EXHAUSTED`) → rotate to the next key and
//!    retry immediately. With fewer than two keys there is nothing to rotate
//!    to, so the call fails with `Error::DailyLimitReached`.
//! 2. Server overloaded (503 / "overloaded") → sleep, retry on the same key.
//!
//! Anything else is handed back to the caller untouched. The total number of
//! attempts is bounded by `keys * 3 + 3`.

pub mod classify;
pub mod error;
pub mod invoke;
pub mod metrics;
pub mod rotator;

pub use classify::{ErrorClassification, FailureSignal, Outcome, classify};
pub use error::{Error, Result};
pub use invoke::{ResilientInvoker, RetryPolicy};
pub use rotator::KeyRotator;
