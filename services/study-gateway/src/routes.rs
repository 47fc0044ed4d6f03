//! Generation endpoints
//!
//! Every `POST /v1/*` route takes JSON, runs the matching assistant operation,
//! and answers with a JSON object plus `request_id`: `{"text": ...}` for the
//! text-producing routes, `{"slides": [...]}` for `/v1/presentation`.
//! Failures answer `{"error":{"type","message","request_id"}}` with the status
//! from `ApiError::status`.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use generative::InlineData;
use generative::inline::{is_valid_base64, mime_type_for, strip_data_url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::AppState;
use crate::documents::{AssignmentBrief, PresentationBrief, ReportBrief};
use crate::error::ApiError;

/// Used when a sheet upload comes without instructions.
pub const DEFAULT_SHEET_PROMPT: &str = "Solve all questions in this worksheet.";

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
    #[serde(default)]
    pub system_instruction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    pub question: String,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SheetRequest {
    #[serde(default)]
    pub file_name: String,
    pub data_base64: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub prompt: String,
}

/// JSON error body: {"error":{"type":"...","message":"...","request_id":"req_..."}}
pub fn error_response(status: StatusCode, error_type: &str, message: &str, request_id: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "type": error_type,
            "message": message,
            "request_id": request_id,
        }
    });
    (status, Json(body)).into_response()
}

pub fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

pub async fn text_handler(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Response {
    respond(&state, "/v1/text", new_request_id(), async {
        let Json(body) = payload.map_err(rejection)?;
        let prompt = non_empty(&body.prompt, "prompt")?;
        let text = state
            .assistant
            .generate_text(prompt, body.system_instruction)
            .await?;
        Ok::<_, ApiError>(serde_json::json!({ "text": text }))
    })
    .await
}

pub async fn quiz_handler(
    State(state): State<AppState>,
    payload: Result<Json<QuizRequest>, JsonRejection>,
) -> Response {
    respond(&state, "/v1/quiz", new_request_id(), async {
        let Json(body) = payload.map_err(rejection)?;
        let question = non_empty(&body.question, "question")?;
        let image = match body.image_base64.as_deref().map(str::trim) {
            Some(data) if !data.is_empty() => {
                Some(inline_data(data, body.mime_type.as_deref(), "", "image_base64")?)
            }
            _ => None,
        };
        let text = state.assistant.solve_quiz(question, image).await?;
        Ok::<_, ApiError>(serde_json::json!({ "text": text }))
    })
    .await
}

pub async fn sheet_handler(
    State(state): State<AppState>,
    payload: Result<Json<SheetRequest>, JsonRejection>,
) -> Response {
    respond(&state, "/v1/sheet", new_request_id(), async {
        let Json(body) = payload.map_err(rejection)?;
        let sheet = inline_data(
            body.data_base64.trim(),
            body.mime_type.as_deref(),
            &body.file_name,
            "data_base64",
        )?;
        let prompt = match body.prompt.trim() {
            "" => DEFAULT_SHEET_PROMPT,
            p => p,
        };
        info!(file_name = %body.file_name, mime_type = %sheet.mime_type, "processing sheet");
        let text = state.assistant.solve_sheet(sheet, prompt).await?;
        Ok::<_, ApiError>(serde_json::json!({ "text": text }))
    })
    .await
}

pub async fn assignment_handler(
    State(state): State<AppState>,
    payload: Result<Json<AssignmentBrief>, JsonRejection>,
) -> Response {
    respond(&state, "/v1/assignment", new_request_id(), async {
        let Json(mut brief) = payload.map_err(rejection)?;
        brief.subject = non_empty(&brief.subject, "subject")?.to_string();
        brief.topic = non_empty(&brief.topic, "topic")?.to_string();
        let text = state.assistant.write_assignment(&brief).await?;
        Ok::<_, ApiError>(serde_json::json!({ "text": text }))
    })
    .await
}

pub async fn report_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReportBrief>, JsonRejection>,
) -> Response {
    respond(&state, "/v1/report", new_request_id(), async {
        let Json(mut brief) = payload.map_err(rejection)?;
        brief.topic = non_empty(&brief.topic, "topic")?.to_string();
        let text = state.assistant.write_report(&brief).await?;
        Ok::<_, ApiError>(serde_json::json!({ "text": text }))
    })
    .await
}

pub async fn presentation_handler(
    State(state): State<AppState>,
    payload: Result<Json<PresentationBrief>, JsonRejection>,
) -> Response {
    respond(&state, "/v1/presentation", new_request_id(), async {
        let Json(mut brief) = payload.map_err(rejection)?;
        brief.topic = non_empty(&brief.topic, "topic")?.to_string();
        let slides = state.assistant.build_presentation(&brief).await?;
        info!(slides = slides.len(), "presentation outline ready");
        Ok::<_, ApiError>(serde_json::json!({ "slides": slides }))
    })
    .await
}

/// Run one request: count it, time it, and turn the result into a response.
/// `work` yields a JSON object; `request_id` is added to it.
#[instrument(skip_all, fields(request_id = %request_id, route = route))]
async fn respond<F>(state: &AppState, route: &'static str, request_id: String, work: F) -> Response
where
    F: Future<Output = Result<Value, ApiError>>,
{
    let started = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let (status, response) = match work.await {
        Ok(mut body) => {
            if let Some(fields) = body.as_object_mut() {
                fields.insert("request_id".into(), Value::from(request_id));
            }
            (StatusCode::OK, Json(body).into_response())
        }
        Err(err) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            let status = err.status();
            warn!(status = status.as_u16(), error_type = err.error_type(), error = %err, "request failed");
            (
                status,
                error_response(status, err.error_type(), &err.to_string(), &request_id),
            )
        }
    };

    crate::metrics::record_request(route, status.as_u16(), started.elapsed().as_secs_f64());
    response
}

fn rejection(e: JsonRejection) -> ApiError {
    ApiError::BadRequest(e.body_text())
}

fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    match value.trim() {
        "" => Err(ApiError::BadRequest(format!("{field} must not be empty"))),
        v => Ok(v),
    }
}

/// Accepts raw base64 or a `data:` URL. MIME precedence: explicit field,
/// then the data URL header, then the file extension.
fn inline_data(
    data: &str,
    mime_type: Option<&str>,
    file_name: &str,
    field: &str,
) -> Result<InlineData, ApiError> {
    let (payload, url_mime) = strip_data_url(data);
    if payload.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    if !is_valid_base64(payload) {
        return Err(ApiError::BadRequest(format!("{field} is not valid base64")));
    }
    let explicit = mime_type.filter(|m| !m.trim().is_empty()).or(url_mime);
    Ok(InlineData {
        mime_type: mime_type_for(file_name, explicit),
        data: payload.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_data_from_data_url() {
        let inline = inline_data("data:image/png;base64,aGVsbG8=", None, "", "f").unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "aGVsbG8=");
    }

    #[test]
    fn inline_data_explicit_mime_beats_data_url() {
        let inline =
            inline_data("data:image/png;base64,aGVsbG8=", Some("image/webp"), "", "f").unwrap();
        assert_eq!(inline.mime_type, "image/webp");
    }

    #[test]
    fn inline_data_uses_file_extension() {
        let inline = inline_data("JVBERg==", None, "homework.pdf", "f").unwrap();
        assert_eq!(inline.mime_type, "application/pdf");
    }

    #[test]
    fn inline_data_defaults_to_jpeg() {
        let inline = inline_data("aGVsbG8=", None, "", "f").unwrap();
        assert_eq!(inline.mime_type, "image/jpeg");
    }

    #[test]
    fn inline_data_rejects_bad_input() {
        let err = inline_data("%%%", None, "", "image_base64").unwrap_err();
        assert!(err.to_string().contains("image_base64 is not valid base64"));
        let err = inline_data("data:image/png;base64,", None, "", "data_base64").unwrap_err();
        assert!(err.to_string().contains("data_base64 must not be empty"));
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("  hi ", "prompt").unwrap(), "hi");
        assert!(non_empty("   ", "prompt").is_err());
    }

    #[test]
    fn request_ids_are_prefixed_and_unique() {
        let a = new_request_id();
        let b = new_request_id();
        assert!(a.starts_with("req_"));
        assert_ne!(a, b);
    }
}
