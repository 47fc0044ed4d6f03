//! Helpers for attaching files as inline data

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// MIME type assumed when neither the caller nor the file extension tells us.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Strip a `data:<mime>;base64,` prefix if present, returning the payload and
/// the MIME type carried by the prefix.
pub fn strip_data_url(input: &str) -> (&str, Option<&str>) {
    match input.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((header, payload)) => {
            let mime = header.strip_suffix(";base64").unwrap_or(header);
            let mime = (!mime.is_empty()).then_some(mime);
            (payload, mime)
        }
        None => (input, None),
    }
}

/// Check that `data` is valid standard base64.
pub fn is_valid_base64(data: &str) -> bool {
    STANDARD.decode(data).is_ok()
}

/// Resolve the MIME type for an uploaded file.
///
/// An explicit, non-empty type wins. Otherwise the file extension decides;
/// unknown extensions fall back to `image/jpeg`.
pub fn mime_type_for(file_name: &str, explicit: Option<&str>) -> String {
    if let Some(mime) = explicit.map(str::trim).filter(|m| !m.is_empty()) {
        return mime.to_string();
    }
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => DEFAULT_MIME_TYPE,
    }
    .to_string()
}
