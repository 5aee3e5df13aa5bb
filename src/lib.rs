// Todo & API key REST backend
// Main library module

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod routes;
pub mod security;
pub mod store;

use chrono::NaiveDate;
use std::sync::Arc;

// Re-export commonly used items
pub use config::Config;
pub use database::Database;
pub use errors::ApiError;
pub use models::{ApiKey, ApiKeySettings, Difficulty, TodoItem, User};
pub use security::{ApiKeyGenerator, ApiKeyService};
pub use store::{ApiKeyStore, TodoStore, UserStore};

/// Everything the handlers need, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<ApiKeyService>,
    pub todos: Arc<dyn TodoStore>,
    pub todos_release_date: Option<NaiveDate>,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> Self {
        let db = Arc::new(db);
        let api_keys = ApiKeyService::new(
            db.clone(),
            db.clone(),
            ApiKeyGenerator::new(config.api_key_prefix.clone()),
            config.api_keys,
        );

        Self {
            api_keys: Arc::new(api_keys),
            todos: db,
            todos_release_date: config.todos_release_date,
        }
    }
}
