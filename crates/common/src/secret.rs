//! Redacting wrapper for API keys and other sensitive values

use std::fmt;
use zeroize::Zeroize;

/// Sensitive value. Never printed by Debug/Display; wiped on drop.
pub struct Secret<T: Zeroize>(T);

/// The common case: an API key string.
pub type SecretString = Secret<String>;

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the inner value. Only call this at the point the value leaves
    /// the process (e.g. an outgoing request header).
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl SecretString {
    /// An empty key, used when no credentials are configured.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let key = SecretString::from("AIzaSy-test-key");
        assert_eq!(format!("{key:?}"), "[REDACTED]");
        assert_eq!(format!("{key}"), "[REDACTED]");
    }

    #[test]
    fn redaction_survives_nesting() {
        let keys = vec![SecretString::from("k1"), SecretString::from("k2")];
        let debug = format!("{keys:?}");
        assert!(!debug.contains("k1"), "got: {debug}");
        assert!(!debug.contains("k2"), "got: {debug}");
    }

    #[test]
    fn expose_returns_inner_value() {
        let key = SecretString::from("AIzaSy-test-key");
        assert_eq!(key.expose(), "AIzaSy-test-key");
    }

    #[test]
    fn empty_key() {
        assert!(SecretString::empty().is_empty());
        assert!(!SecretString::from("x").is_empty());
    }
}
