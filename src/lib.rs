// Library exports for the auth backend
// This file exposes modules and functions for library consumers

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, API_V1_PREFIX, CONFIG};
pub use db::{DieselDatabaseConfig, DieselPool, UnitOfWork};
pub use middleware::{AccessBearer, RefreshBearer, VerifiedToken};
pub use models::{
    AuthSession, RefreshCredential, RefreshTokenError, RevokeReason, SessionRead, User, UserRead,
};
pub use services::{AuthService, TokenCodec, TokenError, TokenPair, TokenType, UsersService};
pub use utils::auth_errors::AuthError;

// Re-export handler route builders
pub use handlers::{auth_routes, user_routes};

use std::sync::Arc;

// Library initialization function for external consumers
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    use tracing::info;

    // Load environment
    dotenv::dotenv().ok();

    // Initialize config
    let config = app_config::config();

    // Initialize database pool
    info!("Initializing database pool...");
    let db_config = db::DieselDatabaseConfig::default();
    let diesel_pool = db::create_diesel_pool(db_config).await?;

    // Run embedded migrations
    info!("Running embedded migrations...");
    let applied = db::run_migrations(config.database.url())
        .await
        .map_err(|e| format!("Migration failed: {}", e))?;
    info!("{} migrations applied", applied);

    // Load RS256 key material once
    let token_codec = Arc::new(services::TokenCodec::from_config(&config.jwt)?);

    Ok(AppState {
        config: Arc::new(config.clone()),
        diesel_pool,
        token_codec,
    })
}

// Health check handler
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let timestamp = chrono::Utc::now().to_rfc3339();

    match db::check_diesel_health(&state.diesel_pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": "auth-backend",
                "timestamp": timestamp,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unhealthy",
                "service": "auth-backend",
                "timestamp": timestamp,
                "error": format!("Database connection failed: {}", e),
            })),
        ),
    }
}
