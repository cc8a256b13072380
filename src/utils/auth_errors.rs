// Domain error taxonomy and its single translation point to HTTP
//
// Services raise these unmodified; the IntoResponse impl is the only place
// status codes, machine codes and headers are decided. Every 401 carries
// `WWW-Authenticate: Bearer`. UserNotFound and WrongPassword map to the
// same response on purpose: callers must not learn which one happened.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::token::TokenError;

/// Authentication domain errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailAlreadyUsed,

    #[error("Invalid credentials")]
    UserNotFound,

    #[error("Invalid credentials")]
    WrongPassword,

    #[error("User is inactive")]
    UserInactive,

    #[error("User not found")]
    CurrentUserNotFound,

    #[error("Not authenticated")]
    AuthHeaderMissing,

    #[error("Invalid authentication scheme")]
    AuthSchemeInvalid,

    #[error("Token expired.")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Invalid token type.")]
    TokenWrongType,

    #[error("Malformed refresh token")]
    MalformedRefreshToken,

    #[error("Refresh token reuse detected")]
    RefreshReuseDetected,

    #[error("Could not refresh tokens: {0}")]
    RefreshRotate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error envelope returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::EmailAlreadyUsed => StatusCode::CONFLICT,
            AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::WrongPassword => StatusCode::UNAUTHORIZED,
            AuthError::UserInactive => StatusCode::FORBIDDEN,
            AuthError::CurrentUserNotFound => StatusCode::NOT_FOUND,
            AuthError::AuthHeaderMissing => StatusCode::UNAUTHORIZED,
            AuthError::AuthSchemeInvalid => StatusCode::UNAUTHORIZED,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::TokenInvalid(_) => StatusCode::UNAUTHORIZED,
            AuthError::TokenWrongType => StatusCode::BAD_REQUEST,
            AuthError::MalformedRefreshToken => StatusCode::BAD_REQUEST,
            AuthError::RefreshReuseDetected => StatusCode::UNAUTHORIZED,
            AuthError::RefreshRotate(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::EmailAlreadyUsed => "email_taken",
            AuthError::UserNotFound => "invalid_credentials",
            AuthError::WrongPassword => "invalid_credentials",
            AuthError::UserInactive => "user_inactive",
            AuthError::CurrentUserNotFound => "user_not_found",
            AuthError::AuthHeaderMissing => "not_authenticated",
            AuthError::AuthSchemeInvalid => "invalid_auth_scheme",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenInvalid(_) => "invalid_token",
            AuthError::TokenWrongType => "invalid_token_type",
            AuthError::MalformedRefreshToken => "malformed_refresh_token",
            AuthError::RefreshReuseDetected => "refresh_reuse_detected",
            AuthError::RefreshRotate(_) => "cannot_refresh",
            AuthError::Validation(_) => "validation_error",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Whether the response must advertise the Bearer challenge
    pub fn www_authenticate(&self) -> bool {
        self.status_code() == StatusCode::UNAUTHORIZED
    }

    /// The human message placed in the envelope. Internal detail never
    /// leaks: 500s always render a generic message.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::RefreshRotate(_) => "Could not refresh tokens".to_string(),
            AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal failure surfaced to client");
        }

        let body = ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.public_message(),
            },
        };

        let mut response = (self.status_code(), Json(body)).into_response();
        if self.www_authenticate() {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid(reason) => AuthError::TokenInvalid(reason),
            TokenError::Encoding(reason) => AuthError::Internal(reason),
            TokenError::KeyLoad(reason) => AuthError::Internal(reason),
        }
    }
}

impl From<diesel::result::Error> for AuthError {
    fn from(err: diesel::result::Error) -> Self {
        AuthError::Internal(format!("database error: {}", err))
    }
}

impl From<crate::db::UowError> for AuthError {
    fn from(err: crate::db::UowError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<crate::models::SessionError> for AuthError {
    fn from(err: crate::models::SessionError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<crate::models::RefreshTokenError> for AuthError {
    fn from(err: crate::models::RefreshTokenError) -> Self {
        use crate::models::RefreshTokenError;
        match err {
            RefreshTokenError::Rotate(reason) => AuthError::RefreshRotate(reason),
            // NotActive is handled by the rotation flow before it can get
            // here; anything else is infrastructure
            other => AuthError::Internal(other.to_string()),
        }
    }
}
