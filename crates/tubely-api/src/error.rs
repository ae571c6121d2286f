//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. Library errors convert into
//! `AppError` here, picking the variant that matches their failure class, and
//! `HttpAppError` renders the JSON body.

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use std::io;
use tubely_core::{AppError, ErrorMetadata, LogLevel};
use tubely_processing::{
    IngestError, OwnershipError, ProbeError, RewriteError, ThumbnailError,
};
use tubely_storage::StorageError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from tubely-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Dependency detail never leaves the process in production or for sensitive errors.
        let show_details = !is_production_env() && !app_error.is_sensitive();
        let body = ErrorResponse {
            error: app_error.client_message(),
            details: show_details.then(|| app_error.detailed_message()),
            error_type: show_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        };

        (status, Json(body)).into_response()
    }
}

/// Classify a failed read of the request body.
///
/// Reads that die because the body limit was hit are 413; anything else the
/// client sent that could not be read is a 400.
pub fn upload_read_error(err: &io::Error) -> AppError {
    let multipart = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>());

    match multipart {
        Some(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            AppError::PayloadTooLarge("Upload exceeds the maximum allowed size".to_string())
        }
        Some(e) => AppError::BadRequest(format!("Couldn't read upload: {}", e.body_text())),
        None => AppError::BadRequest(format!("Couldn't read upload: {}", err)),
    }
}

/// Multipart framing errors before the file part is reached.
pub fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the maximum allowed size".to_string())
    } else {
        AppError::BadRequest(format!("Unable to parse form file: {}", err.body_text()))
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

fn storage_app_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(msg) => AppError::NotFound(msg),
        StorageError::InvalidKey(msg) => AppError::Storage(format!("Invalid storage key: {}", msg)),
        StorageError::ConfigError(msg) => AppError::Configuration(msg),
        StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
        other => AppError::Storage(other.to_string()),
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(storage_app_error(err))
    }
}

fn ownership_app_error(err: OwnershipError) -> AppError {
    match err {
        OwnershipError::NotFound(_) => AppError::NotFound("Video not found".to_string()),
        OwnershipError::NotOwner { .. } => {
            AppError::Unauthorized("You can't modify this video".to_string())
        }
        OwnershipError::Store(e) => e,
    }
}

impl From<OwnershipError> for HttpAppError {
    fn from(err: OwnershipError) -> Self {
        HttpAppError(ownership_app_error(err))
    }
}

impl From<IngestError> for HttpAppError {
    fn from(err: IngestError) -> Self {
        let app = match err {
            IngestError::Ownership(e) => ownership_app_error(e),
            IngestError::EmptyUpload => AppError::BadRequest("Empty video file".to_string()),
            IngestError::UnsupportedMediaType(_) => {
                AppError::BadRequest("Only MP4 videos are supported".to_string())
            }
            IngestError::PayloadTooLarge { limit } => AppError::PayloadTooLarge(format!(
                "Video exceeds the {} MB limit",
                limit / 1024 / 1024
            )),
            IngestError::UploadRead(e) => upload_read_error(&e),
            IngestError::Staging(e) => {
                AppError::MediaProcessing(format!("failed to stage upload: {}", e))
            }
            IngestError::Probe(ProbeError::InvalidExecutable(msg))
            | IngestError::Rewrite(RewriteError::InvalidExecutable(msg)) => {
                AppError::Configuration(msg)
            }
            e @ (IngestError::Probe(_) | IngestError::Rewrite(_)) => {
                AppError::MediaProcessing(e.to_string())
            }
            IngestError::Placement(e) => AppError::Configuration(e.to_string()),
            IngestError::Storage(e) => storage_app_error(e),
            IngestError::MetadataUpdate(e) => e,
        };
        HttpAppError(app)
    }
}

impl From<ThumbnailError> for HttpAppError {
    fn from(err: ThumbnailError) -> Self {
        let app = match err {
            ThumbnailError::Ownership(e) => ownership_app_error(e),
            ThumbnailError::EmptyUpload => {
                AppError::BadRequest("Empty thumbnail file".to_string())
            }
            ThumbnailError::UnknownExtension(media_type) => {
                AppError::BadRequest(format!("Unsupported thumbnail type: {}", media_type))
            }
            ThumbnailError::PayloadTooLarge { limit } => AppError::PayloadTooLarge(format!(
                "Thumbnail exceeds the {} MB limit",
                limit / 1024 / 1024
            )),
            ThumbnailError::UploadRead(e) => upload_read_error(&e),
            ThumbnailError::Storage(e) => storage_app_error(e),
            ThumbnailError::MetadataUpdate(e) => e,
        };
        HttpAppError(app)
    }
}
