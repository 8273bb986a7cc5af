pub mod health;
pub mod records;

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::core::records::RecordError;

/// Error body returned by every endpoint: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match &err {
            RecordError::InvalidRecordId
            | RecordError::NoDataProvided
            | RecordError::FileProcessing(_) => Self::bad_request(err.to_string()),
            RecordError::RecordNotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            RecordError::Store(e) => {
                error!("Record store failure: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        // Body limit violations keep their 413.
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}
