//! API error types with JSON responses.
//!
//! Every error leaves the server as `{"detail": "...", "code": "..."}`.
//! `detail` always ends with a period and `code` is lowercase snake_case.
//! Internal faults are logged in full and reported with a fixed message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use planner_core::{AccessError, HrefError, ValidationError};
use planner_store::StoreError;

/// Detail reported for every internal fault.
pub const UNKNOWN_ERROR: &str = "An Unknown Error occurred.";

/// API error that can be returned from handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Rejected input (400).
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// No credentials supplied (401).
    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    /// Credentials supplied but rejected (401).
    #[error("{0}")]
    AuthenticationFailed(String),

    /// Missing or hidden resource (404).
    #[error("Not found.")]
    NotFound,

    /// Known path, unsupported method (405).
    #[error("Method \"{0}\" not allowed.")]
    MethodNotAllowed(String),

    /// Forbidden (403).
    #[error("{0}")]
    Forbidden(String),

    /// Conflict (409).
    #[error("{0}")]
    Conflict(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Store error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Link construction failed.
    #[error("href error: {0}")]
    Href(#[from] HrefError),
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotFound => Self::NotFound,
            AccessError::Forbidden(detail) => Self::Forbidden(detail.to_string()),
        }
    }
}

impl ApiError {
    /// Get the error code string for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code,
            Self::NotAuthenticated => "not_authenticated",
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::Forbidden(_) => "permission_denied",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) | Self::Href(_) => "unknown_error",
            Self::Store(e) => match e {
                e if e.is_not_found() => "not_found",
                StoreError::OwnerNotRemovable(_) => "permission_denied",
                StoreError::Conflict(_) => "conflict",
                _ => "unknown_error",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated | Self::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) | Self::Href(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(e) => match e {
                e if e.is_not_found() => StatusCode::NOT_FOUND,
                StoreError::OwnerNotRemovable(_) => StatusCode::FORBIDDEN,
                StoreError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// The client-facing message. Internal details never leave the server.
    pub fn detail(&self) -> String {
        let detail = match self {
            Self::Store(e) if e.is_not_found() => "Not found.".to_string(),
            Self::Store(StoreError::OwnerNotRemovable(_)) => {
                planner_core::access::OWNER_NOT_REMOVABLE.to_string()
            }
            Self::Store(StoreError::Conflict(what)) => what.clone(),
            _ if self.status_code().is_server_error() => UNKNOWN_ERROR.to_string(),
            _ => self.to_string(),
        };
        with_period(detail)
    }
}

fn with_period(mut detail: String) -> String {
    if !detail.ends_with('.') {
        detail.push('.');
    }
    detail
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message, always ending with a period.
    pub detail: String,
    /// Lowercase snake_case error code.
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed with an internal error");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = ErrorResponse {
            detail: self.detail(),
            code: self.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use planner_core::BoardId;

    #[test]
    fn test_internal_errors_do_not_leak() {
        let err = ApiError::Store(StoreError::Unavailable("pool timed out on 10.0.0.3".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "unknown_error");
        assert_eq!(err.detail(), UNKNOWN_ERROR);

        let err = ApiError::Href(HrefError::RouteNotFound("x".into()));
        assert_eq!(err.detail(), UNKNOWN_ERROR);
    }

    #[test]
    fn test_store_errors_map_to_client_statuses() {
        let err = ApiError::Store(StoreError::BoardNotFound(BoardId(4)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.detail(), "Not found.");

        let err = ApiError::Store(StoreError::OwnerNotRemovable(BoardId(4)));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "permission_denied");
        assert_eq!(err.detail(), "The board owner cannot be removed.");
    }

    #[test]
    fn test_details_end_with_period() {
        let err = ApiError::AuthenticationFailed("Given token not valid".into());
        assert_eq!(err.detail(), "Given token not valid.");
        assert_eq!(err.code(), "authentication_failed");

        let err = ApiError::from(ValidationError::field("title", "required", "This field is required."));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "This field is required.");
        assert_eq!(err.code(), "required");
    }

    #[test]
    fn test_method_not_allowed() {
        let err = ApiError::MethodNotAllowed("POST".into());
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.code(), "method_not_allowed");
        assert_eq!(err.detail(), "Method \"POST\" not allowed.");
    }

    #[test]
    fn test_access_errors() {
        assert_eq!(ApiError::from(AccessError::NotFound).status_code(), StatusCode::NOT_FOUND);
        let err = ApiError::from(AccessError::Forbidden(planner_core::access::OWNER_ONLY));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.detail(), "Only the board owner may perform this action.");
    }
}
