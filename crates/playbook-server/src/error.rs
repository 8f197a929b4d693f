use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use playbook_core::PlaybookError;

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Core errors pass through with a
/// status derived from their variant; anything else is a 500.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<PlaybookError>() {
            match e {
                PlaybookError::NotInitialized => StatusCode::BAD_REQUEST,
                PlaybookError::TemplateNotFound(_) | PlaybookError::UnknownStep { .. } => {
                    StatusCode::NOT_FOUND
                }
                PlaybookError::TemplateExists(_) | PlaybookError::StepBlocked { .. } => {
                    StatusCode::CONFLICT
                }
                PlaybookError::InvalidSlug(_) | PlaybookError::InvalidUserId(_) => {
                    StatusCode::BAD_REQUEST
                }
                PlaybookError::DuplicateOrderIndex { .. }
                | PlaybookError::DuplicateStepId { .. }
                | PlaybookError::EmptyTemplate(_) => StatusCode::UNPROCESSABLE_ENTITY,
                // Storage outages are retryable; clients should back off and
                // resubmit.
                PlaybookError::Io(_) => StatusCode::SERVICE_UNAVAILABLE,
                PlaybookError::Yaml(_) | PlaybookError::Json(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
