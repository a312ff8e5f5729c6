use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::error;

use super::grading::GradingError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum LearnError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Score undefined: {0}")]
    DivisionUndefined(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GradingError> for LearnError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::DivisionUndefined => {
                Self::DivisionUndefined(GradingError::DivisionUndefined.to_string())
            }
            GradingError::ValidationFailed(msg) => Self::Validation(msg),
        }
    }
}

impl LearnError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DivisionUndefined(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LearnError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            Self::NotFound(msg)
            | Self::DivisionUndefined(msg)
            | Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Store(_) | Self::Internal(_) => {
                error!("{self}");
                "Server error".to_string()
            }
        };
        (
            status,
            Json(serde_json::json!({
                "success": false,
                "error": message
            })),
        )
            .into_response()
    }
}
