use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::errors::{CoreError, CoreErrorKind};

/// JSON error body for a failed operation. Internal failures are logged with
/// their source and answered with a generic message.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let kind = err.kind();
        let status = StatusCode::from_u16(kind.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = if kind == CoreErrorKind::Internal {
            error!("Internal error: {:?}", err);
            json!({
                "error": kind.code(),
                "message": "Internal server error",
            })
        } else {
            json!({
                "error": kind.code(),
                "message": err.message(),
                "fields": err.fields(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
