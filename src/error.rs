use std::fmt;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UploadFailed,
    StartFailed,
    StopFailed,
    /// Soft failure: the next poll tick retries implicitly.
    FetchFailed,
    /// Fatal to the session; surfaced to the user.
    ResultsUnavailable,
    /// Rejected locally before any network call.
    ValidationFailed,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::UploadFailed => "upload failed",
            ErrorKind::StartFailed => "start failed",
            ErrorKind::StopFailed => "stop failed",
            ErrorKind::FetchFailed => "fetch failed",
            ErrorKind::ResultsUnavailable => "results unavailable",
            ErrorKind::ValidationFailed => "validation failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured failure from the analytics backend or local validation.
///
/// `Display` is the human-readable message only, so a backend `{error: "..."}`
/// reaches the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed, message)
    }

    /// Builds the error for a non-2xx response: the body's `error` field when
    /// present, else `fallback`.
    pub fn from_body(kind: ErrorKind, body: &str, fallback: &str) -> Self {
        let message = error_message_from_body(body).unwrap_or_else(|| fallback.to_string());
        Self::new(kind, message)
    }

    /// Transport-level failure (connect, timeout, undecodable body).
    pub fn transport(kind: ErrorKind, fallback: &str, err: impl fmt::Display) -> Self {
        Self::new(kind, format!("{fallback} ({err})"))
    }
}

pub fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    let message = value.get("error")?.as_str()?.trim();
    if message.is_empty() {
        return None;
    }
    Some(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_error_is_used_verbatim() {
        let err = ApiError::from_body(
            ErrorKind::StartFailed,
            r#"{"error": "no video"}"#,
            "Failed to start analysis",
        );
        assert_eq!(err.kind, ErrorKind::StartFailed);
        assert_eq!(err.to_string(), "no video");
    }

    #[test]
    fn falls_back_on_html_or_empty_error() {
        let html = ApiError::from_body(ErrorKind::UploadFailed, "<h1>502</h1>", "Upload failed");
        assert_eq!(html.message, "Upload failed");

        let blank = ApiError::from_body(ErrorKind::UploadFailed, r#"{"error": "  "}"#, "Upload failed");
        assert_eq!(blank.message, "Upload failed");

        let wrong_type = ApiError::from_body(ErrorKind::FetchFailed, r#"{"error": 42}"#, "x");
        assert_eq!(wrong_type.message, "x");
    }
}
