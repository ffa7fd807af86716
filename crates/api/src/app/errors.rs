use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use quill_auth::{AuthzError, PasswordError, TokenError};
use quill_core::DomainError;

/// Every way a request can fail, mapped to a client-visible status.
///
/// Credential and identity failures are 401, role/ownership failures 403,
/// missing resources 404. Only signing and internal faults become 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authorization header is missing")]
    MissingCredentials,

    #[error("authorization header must be 'Bearer <token>'")]
    MalformedHeader,

    #[error("malformed token")]
    MalformedToken(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    ExpiredToken,

    #[error("request identity is missing")]
    MissingIdentity,

    #[error("request identity is invalid: {0}")]
    InvalidIdentity(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    ResourceNotFound(&'static str),

    #[error("invalid email or password")]
    InvalidLogin,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("token signing failed")]
    Signing(String),

    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredentials
            | ApiError::MalformedHeader
            | ApiError::MalformedToken(_)
            | ApiError::InvalidSignature
            | ApiError::ExpiredToken
            | ApiError::MissingIdentity
            | ApiError::InvalidIdentity(_)
            | ApiError::InvalidLogin => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Signing(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingCredentials => "missing_credentials",
            ApiError::MalformedHeader => "malformed_header",
            ApiError::MalformedToken(_) => "malformed_token",
            ApiError::InvalidSignature => "invalid_signature",
            ApiError::ExpiredToken => "token_expired",
            ApiError::MissingIdentity => "missing_identity",
            ApiError::InvalidIdentity(_) => "invalid_identity",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::ResourceNotFound(_) => "not_found",
            ApiError::InvalidLogin => "invalid_login",
            ApiError::Validation(_) => "validation_error",
            ApiError::Conflict(_) => "conflict",
            ApiError::Signing(_) => "signing_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed(msg) => ApiError::MalformedToken(msg),
            TokenError::InvalidSignature => ApiError::InvalidSignature,
            TokenError::Expired => ApiError::ExpiredToken,
            TokenError::Signing(msg) => ApiError::Signing(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Forbidden(msg) => ApiError::Forbidden(msg),
            AuthzError::NotFound(what) => ApiError::ResourceNotFound(what),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::InvalidId(msg) => ApiError::Validation(msg),
            DomainError::NotFound(what) => ApiError::ResourceNotFound(what),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort | PasswordError::TooLong => ApiError::Validation(err.to_string()),
            PasswordError::Hash(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        match &self {
            // Internal details stay in the log, not the response body.
            ApiError::Signing(detail) | ApiError::Internal(detail) => {
                tracing::error!(code = self.code(), %detail, "request failed");
            }
            _ => tracing::debug!(code = self.code(), %status, "request rejected"),
        }
        json_error(status, self.code(), self.to_string())
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
