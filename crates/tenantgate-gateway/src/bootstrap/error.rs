//! Bootstrap error kinds and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::http::responses::ErrorResponse;
use crate::storage::StoreError;

/// Outcome kinds of a failed Join or Auth call.
///
/// Every cause of an authentication failure collapses into `Unauthenticated`
/// so callers cannot discover which tokens exist. `Internal` and
/// `InvariantViolation` carry detail for operator logs only; their HTTP body
/// is generic.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Credentials were supplied to Join.
    #[error("join must be called without credentials")]
    ProtocolViolation,

    /// No active tokens: the gateway is not accepting bootstrap requests.
    #[error("gateway is not accepting bootstrap requests")]
    BootstrapDisabled,

    /// Missing, invalid or unrecognized credential.
    #[error("unauthorized")]
    Unauthenticated,

    /// Malformed request body.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    /// A tenant with the requested client ID already exists.
    #[error("client ID already in use")]
    Conflict,

    /// A signature verified but its payload did not decode.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Key exchange or storage failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BootstrapError {
    /// Wrap a storage failure that happened during `op`.
    pub fn store(op: &str, err: StoreError) -> Self {
        BootstrapError::Internal(format!("{}: {}", op, err))
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BootstrapError::ProtocolViolation => StatusCode::BAD_REQUEST,
            BootstrapError::BootstrapDisabled => StatusCode::METHOD_NOT_ALLOWED,
            BootstrapError::Unauthenticated => StatusCode::UNAUTHORIZED,
            BootstrapError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BootstrapError::Conflict => StatusCode::CONFLICT,
            BootstrapError::InvariantViolation(_) | BootstrapError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BootstrapError {
    fn into_response(self) -> Response {
        let message = match &self {
            BootstrapError::InvariantViolation(_) | BootstrapError::Internal(_) => {
                "internal error".to_string()
            }
            _ => self.to_string(),
        };

        (self.status_code(), Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            BootstrapError::ProtocolViolation.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BootstrapError::BootstrapDisabled.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            BootstrapError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(BootstrapError::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            BootstrapError::InvariantViolation("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_detail_not_exposed() {
        let response =
            BootstrapError::Internal("tenant store unreachable at 10.0.0.1".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "internal error");
    }
}
