//! Gemini REST client
//!
//! Calls `POST {base_url}/v1beta/models/{model}:generateContent` with the key
//! in the `x-goog-api-key` header. Non-success responses are returned as
//! `BackendError::Status` with the raw body so the caller can classify them.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use common::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BackendError, Result};
use crate::request::{GenerateRequest, Part};
use crate::Generator;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` client. Holds no credentials of its own.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    async fn call(&self, api_key: &SecretString, request: &GenerateRequest) -> Result<Option<String>> {
        if request.parts.is_empty() {
            return Err(BackendError::InvalidRequest("request has no content".into()));
        }

        let body = WireRequest::from(request);
        let url = self.endpoint(&request.model);
        debug!(model = %request.model, parts = request.parts.len(), "calling generateContent");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key.expose().as_str())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.without_url().to_string()))?;
        Ok(parsed.text())
    }
}

impl Generator for GeminiClient {
    fn id(&self) -> &str {
        "gemini"
    }

    fn generate<'a>(
        &'a self,
        api_key: &'a SecretString,
        request: &'a GenerateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(self.call(api_key, request))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: [WireContent<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent<'a>>,
}

#[derive(Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: WireInline<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireInline<'a> {
    mime_type: &'a str,
    data: &'a str,
}

impl<'a> From<&'a GenerateRequest> for WireRequest<'a> {
    fn from(req: &'a GenerateRequest) -> Self {
        let parts = req
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart::Text {
                    text: text.as_str(),
                },
                Part::Inline(inline) => WirePart::Inline {
                    inline_data: WireInline {
                        mime_type: inline.mime_type.as_str(),
                        data: inline.data.as_str(),
                    },
                },
            })
            .collect();
        WireRequest {
            contents: [WireContent {
                role: Some("user"),
                parts,
            }],
            system_instruction: req.system_instruction.as_deref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart::Text { text }],
            }),
        }
    }
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Deserialize)]
struct WireCandidate {
    content: Option<WireResponseContent>,
}

#[derive(Deserialize)]
struct WireResponseContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Deserialize)]
struct WireResponsePart {
    text: Option<String>,
}

impl WireResponse {
    /// Concatenated text parts of the first candidate; `None` if there is no text.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use tokio::net::TcpListener;

    /// Start a mock Gemini server. Echoes the api key header and request body
    /// back as the generated text, or fails when the prompt names a status.
    async fn start_mock_gemini() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let app = axum::Router::new().fallback(
                |headers: HeaderMap, uri: axum::http::Uri, body: String| async move {
                    let key = headers
                        .get(API_KEY_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    if body.contains("FAIL_429") {
                        return (
                            StatusCode::TOO_MANY_REQUESTS,
                            r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
                        )
                            .into_response();
                    }
                    if body.contains("EMPTY") {
                        return (StatusCode::OK, r#"{"candidates":[]}"#.to_string()).into_response();
                    }
                    let echoed = serde_json::json!({
                        "key": key,
                        "path": uri.path(),
                        "body": serde_json::from_str::<serde_json::Value>(&body).unwrap(),
                    });
                    let response = serde_json::json!({
                        "candidates": [{
                            "content": {"parts": [{"text": echoed.to_string()}]}
                        }]
                    });
                    (StatusCode::OK, response.to_string()).into_response()
                },
            );
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new(reqwest::Client::new(), base_url, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn sends_key_model_and_parts() {
        let url = start_mock_gemini().await;
        let key = SecretString::from("key-one");
        let request = GenerateRequest::new("gemini-2.5-flash")
            .with_inline("image/png", "aGVsbG8=")
            .with_text("describe")
            .with_system_instruction(Some("be brief".into()));

        let text = client(&url).generate(&key, &request).await.unwrap().unwrap();
        let echoed: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(echoed["key"], "key-one");
        assert_eq!(echoed["path"], "/v1beta/models/gemini-2.5-flash:generateContent");
        let parts = &echoed["body"]["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(parts[1]["text"], "describe");
        assert_eq!(
            echoed["body"]["systemInstruction"]["parts"][0]["text"],
            "be brief"
        );
    }

    #[tokio::test]
    async fn omits_system_instruction_when_absent() {
        let url = start_mock_gemini().await;
        let key = SecretString::from("k");
        let request = GenerateRequest::text("m", "hello");

        let text = client(&url).generate(&key, &request).await.unwrap().unwrap();
        let echoed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(echoed["body"].get("systemInstruction").is_none());
    }

    #[tokio::test]
    async fn error_status_carries_raw_body() {
        let url = start_mock_gemini().await;
        let key = SecretString::from("k");
        let request = GenerateRequest::text("m", "FAIL_429");

        let err = client(&url).generate(&key, &request).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("RESOURCE_EXHAUSTED"), "got: {err}");
    }

    #[tokio::test]
    async fn no_candidates_yields_none() {
        let url = start_mock_gemini().await;
        let key = SecretString::from("k");
        let request = GenerateRequest::text("m", "EMPTY");

        let text = client(&url).generate(&key, &request).await.unwrap();
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn empty_request_is_rejected_locally() {
        let key = SecretString::from("k");
        let request = GenerateRequest::new("m");
        let err = client("http://127.0.0.1:1")
            .generate(&key, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn connection_failure_is_http_error() {
        let key = SecretString::from("k");
        let request = GenerateRequest::text("m", "hi");
        let err = client("http://127.0.0.1:1")
            .generate(&key, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Http(_)), "got: {err:?}");
    }

    #[test]
    fn response_text_concatenates_parts() {
        let parsed: WireResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("ab"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = client("http://example.test/");
        assert_eq!(
            c.endpoint("m"),
            "http://example.test/v1beta/models/m:generateContent"
        );
    }
}
