//! Application error type shared by services and handlers.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::db::StoreError;

/// The errors that may occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The session token is missing, malformed or expired.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The request was understood but its content is not acceptable.
    #[error("{0}")]
    InvalidInput(String),

    /// The request clashes with existing state, e.g. a second active couple.
    #[error("{0}")]
    Conflict(String),

    /// The addressed resource does not exist or is outside the caller's scope.
    #[error("{0}")]
    NotFound(String),

    /// The caller is authenticated but the resource is not meant for them.
    #[error("{0}")]
    Forbidden(String),

    /// An invitation was used after its expiry.
    #[error("{0}")]
    Expired(String),

    /// The store did not answer in time. Clients may retry.
    #[error("service temporarily unavailable")]
    Unavailable,

    /// Anything else. The inner error is logged, never returned to clients.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Expired(_) => StatusCode::GONE,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Timeout => AppError::Unavailable,
            StoreError::Conflict(what) => AppError::Conflict(what),
            StoreError::Database(e) => AppError::Internal(e.into()),
            StoreError::Other(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "unhandled internal error");
                "internal server error".to_string()
            }
            AppError::Unavailable => {
                tracing::warn!("store timed out");
                self.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_timeout_is_retryable_service_error() {
        let err: AppError = StoreError::Timeout.into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let exhausted: AppError = StoreError::from(sqlx::Error::PoolTimedOut).into();
        assert_eq!(exhausted.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let response = AppError::Internal(anyhow::anyhow!("password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(AppError::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Expired("x".into()).status(), StatusCode::GONE);
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);
    }
}
