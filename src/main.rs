use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_backend_core::{
    app::AppState,
    app_config::{self, API_V1_PREFIX},
    db::{create_diesel_pool, mask_connection_string, run_migrations, DieselDatabaseConfig},
    handlers::{auth_routes, user_routes},
    health_check,
    services::TokenCodec,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle version flag for container health checks - must be FIRST
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--version" {
        println!("auth-backend-core v{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_backend_core=debug,axum=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize centralized config (loads all env vars ONCE)
    let config = app_config::config();
    let bind_address = config.server.bind_address();
    info!("Starting auth backend on {}", bind_address);

    // Initialize Diesel database pool
    info!("Initializing database pool...");
    let db_config = DieselDatabaseConfig::default();
    info!("Database URL: {}", mask_connection_string(&db_config.url));

    let diesel_pool = match create_diesel_pool(db_config).await {
        Ok(pool) => {
            info!("Database connection pool initialized");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database pool: {}", e);
            return Err(format!("Database initialization failed: {}", e).into());
        }
    };

    // Run embedded migrations
    info!("Running embedded migrations...");
    match run_migrations(config.database.url()).await {
        Ok(applied) => info!("{} migrations applied", applied),
        Err(e) => {
            error!("Migration failed: {}", e);
            return Err(format!("Migration failed: {}", e).into());
        }
    }

    // Load RS256 key material once; the codec is process-wide and stateless
    let token_codec = match TokenCodec::from_config(&config.jwt) {
        Ok(codec) => Arc::new(codec),
        Err(e) => {
            error!("Failed to load JWT key material: {}", e);
            return Err(format!("JWT key initialization failed: {}", e).into());
        }
    };

    let app_state = AppState {
        config: Arc::new(config.clone()),
        diesel_pool,
        token_codec,
    };

    // Build the application router
    let app = Router::new()
        .route("/health", get(health_check))
        .nest(&format!("{}/auth", API_V1_PREFIX), auth_routes())
        .nest(&format!("{}/users", API_V1_PREFIX), user_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state);

    // Parse and bind to address
    let addr: SocketAddr = bind_address.parse()?;
    info!("Starting HTTP server on {}...", addr);

    // ConnectInfo support is required for client IP tracking at login
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
