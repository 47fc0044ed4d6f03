//! API key pool with a shared rotation cursor
//!
//! The pool is fixed at construction. The cursor selects the active key and
//! only moves when a call reports quota exhaustion. It is shared by every
//! concurrent call through `Arc<KeyRotator>`.
//!
//! Rotation is a load followed by a store, not a compare-and-swap. Two calls
//! that hit quota exhaustion at the same time can both read the same cursor
//! and both advance it to the same next key. That key then absorbs both
//! retries; the cost is at most one wasted rotation per race.

use std::sync::atomic::{AtomicUsize, Ordering};

use common::SecretString;
use tracing::{info, warn};

/// Ordered API keys plus the index of the active one.
pub struct KeyRotator {
    keys: Vec<SecretString>,
    cursor: AtomicUsize,
}

impl KeyRotator {
    /// Create a rotator over `keys`, starting at the first key.
    pub fn new(keys: Vec<SecretString>) -> Self {
        if keys.is_empty() {
            warn!("no API keys configured, backend calls will use an empty key");
        } else {
            info!(keys = keys.len(), "API key pool initialized");
        }
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Parse a delimited key list. Entries are separated by commas or
    /// newlines, trimmed, and empty entries are dropped.
    pub fn from_delimited(raw: &str) -> Self {
        Self::new(parse_keys(raw))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the active key. Always `< len()` for a non-empty pool.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// The active key and its index. An empty pool yields `(None, "")`.
    pub fn current(&self) -> (Option<usize>, SecretString) {
        if self.keys.is_empty() {
            return (None, SecretString::empty());
        }
        let idx = self.cursor() % self.keys.len();
        (Some(idx), self.keys[idx].clone())
    }

    /// Advance to the next key, wrapping at the end.
    ///
    /// Returns `false` without touching the cursor when the pool has fewer
    /// than two keys.
    pub fn rotate(&self) -> bool {
        let n = self.keys.len();
        if n <= 1 {
            return false;
        }
        let next = (self.cursor.load(Ordering::Relaxed) + 1) % n;
        self.cursor.store(next, Ordering::Relaxed);
        crate::metrics::record_rotation();
        info!(key_index = next, key_number = next + 1, keys = n, "switched to next API key");
        true
    }
}

fn parse_keys(raw: &str) -> Vec<SecretString> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(SecretString::from)
        .collect()
}
