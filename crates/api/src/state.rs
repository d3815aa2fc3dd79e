//! Shared application state

use std::sync::Arc;

use notehub_shared::Store;

use crate::auth::JwtManager;
use crate::config::Config;
use crate::email::EmailService;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub jwt: JwtManager,
    pub email: EmailService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret);
        Self {
            store,
            config: Arc::new(config),
            jwt,
            email: EmailService::from_env(),
        }
    }
}
