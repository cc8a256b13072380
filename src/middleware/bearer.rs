// Bearer credential extraction for protected routes
//
// Parses the Authorization header, verifies the credential through the
// codec and checks the declared token type against what the endpoint
// expects. The credential is never logged and never mutated.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::app::AppState;
use crate::services::token::{Claims, TokenCodec, TokenType};
use crate::utils::auth_errors::AuthError;

/// A verified bearer credential: the raw serialized token plus its claims
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub raw_token: String,
    pub claims: Claims,
}

impl VerifiedToken {
    /// The subject of the credential
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.claims
            .user_id()
            .ok_or_else(|| AuthError::TokenInvalid("missing user_id claim".to_string()))
    }
}

/// Verify an Authorization header against the expected token type.
///
/// Failure order, stopping at the first match: missing/empty header or
/// empty credential, wrong scheme, decode failure, wrong declared type.
pub fn verify_bearer(
    header_value: Option<&str>,
    expected: TokenType,
    codec: &TokenCodec,
) -> Result<VerifiedToken, AuthError> {
    let raw_header = header_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::AuthHeaderMissing)?;

    let mut parts = raw_header.splitn(2, char::is_whitespace);
    let scheme = parts.next().unwrap_or("");
    let credential = parts.next().map(str::trim).unwrap_or("");

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::AuthSchemeInvalid);
    }
    if credential.is_empty() {
        return Err(AuthError::AuthHeaderMissing);
    }

    let claims = codec.decode(credential)?;
    if !codec.is_type(&claims, expected) {
        // A refresh surface names the type mismatch (400); an access
        // surface treats any non-access credential as unauthenticated (401)
        return Err(match expected {
            TokenType::Refresh => AuthError::TokenWrongType,
            TokenType::Access => AuthError::TokenInvalid("wrong token type".to_string()),
        });
    }

    Ok(VerifiedToken {
        raw_token: credential.to_string(),
        claims,
    })
}

fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Extractor for endpoints that take an access credential
pub struct AccessBearer(pub VerifiedToken);

impl FromRequestParts<AppState> for AccessBearer {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        verify_bearer(
            authorization_header(parts),
            TokenType::Access,
            &state.token_codec,
        )
        .map(AccessBearer)
    }
}

/// Extractor for endpoints that take a refresh credential
pub struct RefreshBearer(pub VerifiedToken);

impl FromRequestParts<AppState> for RefreshBearer {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        verify_bearer(
            authorization_header(parts),
            TokenType::Refresh,
            &state.token_codec,
        )
        .map(RefreshBearer)
    }
}
