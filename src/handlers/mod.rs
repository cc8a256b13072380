// HTTP handlers and route builders

pub mod auth;
pub mod users;

use axum::{
    routing::{get, post},
    Router,
};

use crate::app::AppState;

// Authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/logout-all", post(auth::logout_all))
        .route("/sessions", get(auth::list_sessions))
}

// User routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/me", get(users::me))
        .route("/change-password", post(users::change_password))
}
