// Application state and configuration
use std::sync::Arc;

use crate::{app_config::AppConfig, db::DieselPool, services::TokenCodec};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub diesel_pool: DieselPool,
    pub token_codec: Arc<TokenCodec>,
}
