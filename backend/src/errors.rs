use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use credential_core::CredentialError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error")]
    Internal,
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidInput(_) | CredentialError::EncodingError(_) => {
                ApiError::BadRequest(err.to_string())
            }
            CredentialError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CredentialError::DuplicateClaim(_) => ApiError::Conflict(err.to_string()),
            CredentialError::SoulboundViolation(_) => ApiError::Forbidden(err.to_string()),
            CredentialError::Unauthorized => ApiError::Unauthorized,
            CredentialError::ReplayError(_) | CredentialError::LockPoisoned => {
                tracing::error!(error = %err, "ledger failure");
                ApiError::Internal
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_http_statuses() {
        let cases = [
            (CredentialError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (CredentialError::EncodingError("x".into()), StatusCode::BAD_REQUEST),
            (CredentialError::Unauthorized, StatusCode::UNAUTHORIZED),
            (CredentialError::SoulboundViolation(0), StatusCode::FORBIDDEN),
            (CredentialError::NotFound(7), StatusCode::NOT_FOUND),
            (CredentialError::DuplicateClaim(0), StatusCode::CONFLICT),
            (CredentialError::LockPoisoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
