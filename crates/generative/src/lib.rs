//! Generative backend abstraction
//!
//! Defines the `Generator` trait that decouples callers from the concrete
//! text/vision backend. A generator takes a request plus the API key to use
//! for this one call, so the same request can be replayed against a different
//! key by a retry wrapper. `GeminiClient` is the production implementation.

pub mod error;
pub mod gemini;
pub mod inline;
pub mod request;

pub use error::{BackendError, Result};
pub use gemini::GeminiClient;
pub use inline::mime_type_for;
pub use request::{GenerateRequest, InlineData, Part};

use common::SecretString;
use std::future::Future;
use std::pin::Pin;

/// Abstraction over a generative text/vision backend.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Generator>`).
pub trait Generator: Send + Sync {
    /// Identifier for logging (e.g. "gemini").
    fn id(&self) -> &str;

    /// Run one generation call authenticated with `api_key`.
    ///
    /// Returns the concatenated text of the first candidate, or `None` when the
    /// backend answered successfully but produced no text.
    fn generate<'a>(
        &'a self,
        api_key: &'a SecretString,
        request: &'a GenerateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;
}
