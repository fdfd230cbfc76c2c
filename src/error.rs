//! # Error Handling
//!
//! This module defines the service's error type and how each variant is
//! turned into an HTTP response.
//!
//! ## Error Categories:
//! - **BadRequest**: malformed body, missing/invalid fields, bad data URI, disallowed URL (400)
//! - **UnsupportedMediaType**: MIME type or extension other than WAV/MP3 (415)
//! - **MethodNotAllowed**: anything but POST on the waveform endpoint (405)
//! - **FetchFailed**: the remote audio could not be downloaded (400)
//! - **Processing**: staging, container parsing or waveform tool failures (500)
//!
//! Every error is terminal for the request it occurs in; nothing is retried.
//! Bodies are plain text so that callers see the tool's diagnostics verbatim.

use actix_web::http::{header::ContentType, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug, Clone)]
pub enum AppError {
    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Audio format is neither WAV nor MP3
    UnsupportedMediaType(String),

    /// Endpoint was called with the wrong HTTP method
    MethodNotAllowed,

    /// Downloading the referenced audio failed (network, DNS, timeout, upstream status)
    FetchFailed(String),

    /// Server-side failure while staging, inspecting or rendering the audio
    Processing(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "{}", msg),
            AppError::UnsupportedMediaType(msg) => write!(f, "{}", msg),
            AppError::MethodNotAllowed => write!(f, "Only POST requests are allowed"),
            AppError::FetchFailed(msg) => write!(f, "Failed to fetch audio from URL: {}", msg),
            AppError::Processing(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Machine-readable label used in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::UnsupportedMediaType(_) => "unsupported_media_type",
            AppError::MethodNotAllowed => "method_not_allowed",
            AppError::FetchFailed(_) => "fetch_failed",
            AppError::Processing(_) => "processing_error",
        }
    }
}

/// Maps each variant to its status code and renders the message as text/plain.
///
/// ## HTTP Status Code Mapping:
/// - BadRequest/FetchFailed → 400
/// - MethodNotAllowed → 405
/// - UnsupportedMediaType → 415
/// - Processing → 500
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::FetchFailed(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }
}

/// Body parsing errors are always the client's fault.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("Failed to decode JSON body: {}", err))
    }
}

/// A blocking task that panicked or was cancelled is a server-side failure.
impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Processing(format!("Blocking task failed: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
