//! Counters for resilient invocation
//!
//! - `genai_attempts_total` (counter): labels `operation`, `outcome`
//! - `genai_key_rotations_total` (counter)
//! - `genai_invocation_failures_total` (counter): label `kind`
//!
//! Without an installed recorder these calls are no-ops.

/// Record one backend attempt and how it ended.
pub fn record_attempt(operation: &str, outcome: &'static str) {
    metrics::counter!(
        "genai_attempts_total",
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a cursor advance.
pub fn record_rotation() {
    metrics::counter!("genai_key_rotations_total").increment(1);
}

/// Record a call that ended in failure, labelled by error kind.
pub fn record_failure(kind: &'static str) {
    metrics::counter!("genai_invocation_failures_total", "kind" => kind).increment(1);
}
