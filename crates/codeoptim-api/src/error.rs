use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use codeoptim_core::CodeOptimError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    CodeOptim(#[from] CodeOptimError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::CodeOptim(CodeOptimError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) | ApiError::CodeOptim(CodeOptimError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::CodeOptim(CodeOptimError::ExternalService(_)) => StatusCode::BAD_GATEWAY,
            ApiError::CodeOptim(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Renders as `{"error": "...", "status": <code>}`.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_http_status() {
        let not_found: ApiError = CodeOptimError::NotFound("x".to_string()).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "Experiment not found: x");

        let upstream: ApiError = CodeOptimError::ExternalService("exa".to_string()).into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        assert_eq!(ApiError::Validation("v".to_string()).status(), StatusCode::BAD_REQUEST);
    }
}
