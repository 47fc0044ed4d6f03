//! Failure classification for backend errors
//!
//! The retry policy only cares about two signals: quota exhaustion and server
//! overload. Both are detected from the HTTP status and from markers in the
//! backend's own error text. Transport and decode failures never reached the
//! backend's quota logic, so they are always `Other`.

use generative::BackendError;

const QUOTA_STATUS: u16 = 429;
const OVERLOAD_STATUS: u16 = 503;

const QUOTA_MARKERS: &[&str] = &["429", "RESOURCE_EXHAUSTED"];
const OVERLOAD_MARKERS: &[&str] = &["503", "overloaded"];

/// What kind of failure a backend error represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// The active key's allowance is used up; another key may work.
    QuotaExceeded,
    /// The backend is temporarily unable to serve; the same key may work later.
    ServerOverloaded,
    /// Not retryable.
    Other,
}

/// Error types the retry wrapper can inspect.
pub trait FailureSignal {
    /// HTTP status of the failed call, if known.
    fn status_code(&self) -> Option<u16>;

    /// Human-readable error text, searched for quota/overload markers.
    fn message(&self) -> String;

    fn classification(&self) -> ErrorClassification {
        classify(self.status_code(), &self.message())
    }
}

impl FailureSignal for BackendError {
    fn status_code(&self) -> Option<u16> {
        self.status()
    }

    fn message(&self) -> String {
        match self {
            BackendError::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }

    fn classification(&self) -> ErrorClassification {
        match self {
            // Only the response body is searched; transport error text
            // embeds the request URL, whose host or port may contain digits
            // like 429 or 503.
            BackendError::Status { status, body } => classify(Some(*status), body),
            BackendError::Http(_) | BackendError::Decode(_) | BackendError::InvalidRequest(_) => {
                ErrorClassification::Other
            }
        }
    }
}

/// Classify a failure by status code and message.
///
/// Quota exhaustion is checked first: a 429 body that also mentions overload
/// is still a quota failure.
pub fn classify(status: Option<u16>, message: &str) -> ErrorClassification {
    if status == Some(QUOTA_STATUS) || QUOTA_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorClassification::QuotaExceeded;
    }
    if status == Some(OVERLOAD_STATUS) || OVERLOAD_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorClassification::ServerOverloaded;
    }
    ErrorClassification::Other
}

/// Result of one attempt, tagged by classification.
///
/// Failure variants keep the original error so it can be logged, or returned
/// unmodified in the `OtherFailure` case.
#[derive(Debug)]
pub enum Outcome<T, E> {
    Success(T),
    QuotaExceeded(E),
    ServerOverloaded(E),
    OtherFailure(E),
}

impl<T, E: FailureSignal> Outcome<T, E> {
    pub fn from_result(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => match err.classification() {
                ErrorClassification::QuotaExceeded => Outcome::QuotaExceeded(err),
                ErrorClassification::ServerOverloaded => Outcome::ServerOverloaded(err),
                ErrorClassification::Other => Outcome::OtherFailure(err),
            },
        }
    }
}

impl<T, E> Outcome<T, E> {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::QuotaExceeded(_) => "quota_exceeded",
            Outcome::ServerOverloaded(_) => "server_overloaded",
            Outcome::OtherFailure(_) => "other_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_quota() {
        assert_eq!(classify(Some(429), ""), ErrorClassification::QuotaExceeded);
    }

    #[test]
    fn resource_exhausted_marker_is_quota() {
        let msg = r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(classify(None, msg), ErrorClassification::QuotaExceeded);
        assert_eq!(
            classify(None, "got status RESOURCE_EXHAUSTED"),
            ErrorClassification::QuotaExceeded
        );
    }

    #[test]
    fn message_with_429_is_quota() {
        assert_eq!(
            classify(None, "[GoogleGenerativeAI Error]: 429 Too Many Requests"),
            ErrorClassification::QuotaExceeded
        );
    }

    #[test]
    fn status_503_is_overload() {
        assert_eq!(classify(Some(503), ""), ErrorClassification::ServerOverloaded);
    }

    #[test]
    fn overloaded_marker_is_overload() {
        assert_eq!(
            classify(None, "The model is overloaded. Please try again later."),
            ErrorClassification::ServerOverloaded
        );
        assert_eq!(
            classify(None, "upstream said 503"),
            ErrorClassification::ServerOverloaded
        );
    }

    #[test]
    fn quota_wins_over_overload() {
        assert_eq!(
            classify(Some(503), "RESOURCE_EXHAUSTED"),
            ErrorClassification::QuotaExceeded
        );
    }

    #[test]
    fn other_statuses_are_other() {
        assert_eq!(classify(Some(400), "invalid argument"), ErrorClassification::Other);
        assert_eq!(classify(Some(500), "internal"), ErrorClassification::Other);
        assert_eq!(classify(None, "connection reset"), ErrorClassification::Other);
    }

    #[test]
    fn backend_error_status_variant() {
        let err = BackendError::Status {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(err.classification(), ErrorClassification::ServerOverloaded);
    }

    #[test]
    fn backend_error_status_body_markers() {
        let err = BackendError::Status {
            status: 400,
            body: r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#.into(),
        };
        assert_eq!(err.classification(), ErrorClassification::QuotaExceeded);
        assert_eq!(err.message(), r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#);

        let err = BackendError::Status {
            status: 500,
            body: "The model is overloaded.".into(),
        };
        assert_eq!(err.classification(), ErrorClassification::ServerOverloaded);
    }

    #[test]
    fn backend_errors_without_status_are_other() {
        let err = BackendError::Http("error sending request for url (http://10.0.42.9:8503/)".into());
        assert_eq!(err.classification(), ErrorClassification::Other);

        let err = BackendError::Decode("RESOURCE_EXHAUSTED 429 at line 1".into());
        assert_eq!(err.classification(), ErrorClassification::Other);

        let err = BackendError::InvalidRequest("503".into());
        assert_eq!(err.classification(), ErrorClassification::Other);
    }

    #[tokio::test]
    async fn connection_refused_with_markers_in_url_is_other() {
        use common::SecretString;
        use generative::{GeminiClient, GenerateRequest, Generator};
        use std::time::Duration;

        // Port 1 is closed; the path carries every marker the classifier knows.
        let client = GeminiClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/429/RESOURCE_EXHAUSTED/503/overloaded",
            Duration::from_secs(5),
        );
        let request = GenerateRequest::text("gemini-2.5-flash", "hi");
        let key = SecretString::from("k");

        let err = client.generate(&key, &request).await.unwrap_err();
        assert!(matches!(err, BackendError::Http(_)), "got: {err:?}");
        assert!(!err.message().contains("127.0.0.1"), "got: {}", err.message());
        assert_eq!(err.classification(), ErrorClassification::Other);
        assert!(matches!(
            Outcome::<(), _>::from_result(Err(err)),
            Outcome::OtherFailure(_)
        ));
    }

    #[test]
    fn outcome_from_result() {
        let ok: Outcome<&str, BackendError> = Outcome::from_result(Ok("text"));
        assert!(matches!(ok, Outcome::Success("text")));
        assert_eq!(ok.label(), "success");

        let quota: Outcome<&str, BackendError> = Outcome::from_result(Err(BackendError::Status {
            status: 429,
            body: String::new(),
        }));
        assert_eq!(quota.label(), "quota_exceeded");

        let other: Outcome<&str, BackendError> =
            Outcome::from_result(Err(BackendError::InvalidRequest("no content".into())));
        match other {
            Outcome::OtherFailure(BackendError::InvalidRequest(msg)) => assert_eq!(msg, "no content"),
            o => panic!("expected OtherFailure, got {}", o.label()),
        }
    }
}
