// User Handlers
// Registration, current-user profile and password change endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    app::AppState,
    db::UnitOfWork,
    middleware::AccessBearer,
    models::UserRead,
    services::UsersService,
    utils::auth_errors::AuthError,
};

// =============================================================================
// REQUEST TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(max = 255, message = "Full name must be at most 255 characters"))]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

/// Flatten validator output into one message for the error envelope
pub(crate) fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// HANDLERS
// =============================================================================

/// POST /users/register - Create a new account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    payload
        .validate()
        .map_err(|e| AuthError::Validation(validation_message(&e)))?;

    let mut uow = UnitOfWork::new(&state.diesel_pool).await?;
    let user = UsersService::new(&mut uow, state.config.security.bcrypt_cost)
        .register(&payload.email, &payload.password, payload.full_name)
        .await?;

    Ok((StatusCode::CREATED, Json(UserRead::from(&user))))
}

/// GET /users/me - Profile of the authenticated user
pub async fn me(
    State(state): State<AppState>,
    AccessBearer(access): AccessBearer,
) -> Result<Json<UserRead>, AuthError> {
    let user_id = access.user_id()?;

    let mut uow = UnitOfWork::new(&state.diesel_pool).await?;
    let user = UsersService::new(&mut uow, state.config.security.bcrypt_cost)
        .get(user_id)
        .await?
        .ok_or(AuthError::CurrentUserNotFound)?;

    if !user.is_active {
        return Err(AuthError::UserInactive);
    }

    Ok(Json(UserRead::from(&user)))
}

/// POST /users/change-password - Rotate the password verifier and revoke
/// everything issued under the old one
pub async fn change_password(
    State(state): State<AppState>,
    AccessBearer(access): AccessBearer,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AuthError> {
    payload
        .validate()
        .map_err(|e| AuthError::Validation(validation_message(&e)))?;

    let user_id = access.user_id()?;

    let mut uow = UnitOfWork::new(&state.diesel_pool).await?;
    UsersService::new(&mut uow, state.config.security.bcrypt_cost)
        .change_password(user_id, &payload.current_password, &payload.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
