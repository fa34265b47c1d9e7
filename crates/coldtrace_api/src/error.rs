use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coldtrace_domain::error::DomainError;
use serde::Serialize;
use tracing::{error, warn};

/// HTTP-facing error. Every handler failure funnels into one of these and
/// the response body always has the same `{status, message}` shape.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status = match &err {
            DomainError::ValidationError(_) => StatusCode::BAD_REQUEST,
            DomainError::LedgerUnavailable(_)
            | DomainError::StoreError(_)
            | DomainError::SubmissionFailure(_)
            | DomainError::NonceConflict { .. }
            | DomainError::RepositoryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "request failed: {}", self.message);
        } else {
            warn!(status = %self.status, "request rejected: {}", self.message);
        }
        (
            self.status,
            Json(ErrorBody {
                status: "error",
                message: self.message,
            }),
        )
            .into_response()
    }
}
