// Authentication Handlers
// Login, refresh rotation, logout, global logout and session listing

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use ipnetwork::IpNetwork;
use serde::Deserialize;
use validator::Validate;

use crate::{
    app::AppState,
    db::UnitOfWork,
    handlers::users::validation_message,
    middleware::{AccessBearer, RefreshBearer},
    models::SessionRead,
    services::{AuthService, TokenPair, UsersService},
    utils::auth_errors::AuthError,
};

// =============================================================================
// REQUEST TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,
}

/// Resolve the client address: first X-Forwarded-For element when present,
/// else the peer address
fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> Option<IpNetwork> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let ip = match forwarded {
        Some(first) => first.parse().ok().unwrap_or_else(|| addr.ip()),
        None => addr.ip(),
    };

    Some(IpNetwork::from(ip))
}

// =============================================================================
// HANDLERS
// =============================================================================

/// POST /auth/login - Verify credentials, open a session, return the pair
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    payload
        .validate()
        .map_err(|e| AuthError::Validation(validation_message(&e)))?;

    let mut uow = UnitOfWork::new(&state.diesel_pool).await?;

    let user = UsersService::new(&mut uow, state.config.security.bcrypt_cost)
        .authenticate(&payload.email, &payload.password)
        .await?;
    if !user.is_active {
        return Err(AuthError::UserInactive);
    }

    let user_agent = user_agent.map(|TypedHeader(ua)| ua.to_string());
    let ip_address = client_ip(&headers, &addr);

    let pair = AuthService::new(&mut uow, state.token_codec.clone())
        .login(user.id, user_agent, ip_address)
        .await?;

    Ok(Json(pair))
}

/// POST /auth/refresh - Redeem a refresh credential for a new pair
pub async fn refresh(
    State(state): State<AppState>,
    RefreshBearer(refresh): RefreshBearer,
) -> Result<Json<TokenPair>, AuthError> {
    let mut uow = UnitOfWork::new(&state.diesel_pool).await?;

    let pair = AuthService::new(&mut uow, state.token_codec.clone())
        .rotate(&refresh.raw_token)
        .await?;

    Ok(Json(pair))
}

/// POST /auth/logout - Revoke the presented refresh credential + session
pub async fn logout(
    State(state): State<AppState>,
    RefreshBearer(refresh): RefreshBearer,
) -> Result<StatusCode, AuthError> {
    let mut uow = UnitOfWork::new(&state.diesel_pool).await?;

    AuthService::new(&mut uow, state.token_codec.clone())
        .logout_by_refresh(&refresh.raw_token)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/logout-all - Revoke every credential and session of the user
pub async fn logout_all(
    State(state): State<AppState>,
    AccessBearer(access): AccessBearer,
) -> Result<StatusCode, AuthError> {
    let user_id = access.user_id()?;

    let mut uow = UnitOfWork::new(&state.diesel_pool).await?;
    AuthService::new(&mut uow, state.token_codec.clone())
        .logout_all(user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/sessions - Active sessions of the user, last seen first
pub async fn list_sessions(
    State(state): State<AppState>,
    AccessBearer(access): AccessBearer,
) -> Result<Json<Vec<SessionRead>>, AuthError> {
    let user_id = access.user_id()?;

    let mut uow = UnitOfWork::new(&state.diesel_pool).await?;
    let sessions = AuthService::new(&mut uow, state.token_codec.clone())
        .list_sessions(user_id)
        .await?;

    Ok(Json(sessions))
}
