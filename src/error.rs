//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for both domain services. Each
//! variant maps to a specific HTTP status code and structured JSON error
//! response. Store and broker failures are grouped as internal errors, see
//! [`GatewayError::is_internal`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2003,
///     "message": "permission denied: alice does not own nb1"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status                        |
/// |-----------|----------------------|------------------------------------|
/// | 1000–1999 | Validation / Auth    | 400 Bad Request / 401 Unauthorized |
/// | 2000–2999 | State                | 403 / 404 / 409                    |
/// | 3000–3999 | Server               | 500 Internal Server Error          |
///
/// Writes that fail with a 3xxx code may already have committed their
/// authoritative effect; callers must not assume a failed create or delete
/// left the durable store untouched.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No valid principal accompanied the request.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The principal does not own the entity according to the authoritative store.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The entity does not exist in the authoritative store.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity with the same name already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authoritative store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Cache store failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// Message broker failure.
    #[error("broker error: {0}")]
    Broker(String),

    /// Orchestration platform failure.
    #[error("platform error: {0}")]
    Platform(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Unauthenticated(_) => 1002,
            Self::NotFound(_) => 2001,
            Self::Conflict(_) => 2002,
            Self::PermissionDenied(_) => 2003,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::Cache(_) => 3002,
            Self::Broker(_) => 3003,
            Self::Platform(_) => 3004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Persistence(_)
            | Self::Cache(_)
            | Self::Broker(_)
            | Self::Platform(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for store, broker, and platform failures.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_)
                | Self::Cache(_)
                | Self::Broker(_)
                | Self::Platform(_)
                | Self::Internal(_)
        )
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<lapin::Error> for GatewayError {
    fn from(err: lapin::Error) -> Self {
        Self::Broker(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_internal() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
