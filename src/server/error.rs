use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::Error;

/// Handler error: any failure plus the status it should be reported with.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    source: anyhow::Error,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            source: anyhow::anyhow!(message.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(err: &anyhow::Error) -> StatusCode {
    if let Some(core) = err.downcast_ref::<Error>() {
        return match core {
            Error::DimensionMismatch { .. } | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Storage(_) | Error::CorruptRecord { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
    }
    if err.downcast_ref::<MultipartError>().is_some() {
        return StatusCode::BAD_REQUEST;
    }
    StatusCode::INTERNAL_SERVER_ERROR
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.source), "request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.source, "request rejected");
        }
        let body = Json(serde_json::json!({ "error": self.source.to_string() }));
        (self.status, body).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let source = err.into();
        Self {
            status: status_for(&source),
            source,
        }
    }
}
