//! Persistence interfaces used by the services and handlers.
//!
//! `Database` implements all of them on top of SQLite; unit tests swap in
//! mocks.

use crate::errors::ApiError;
use crate::models::{ApiKey, TodoItem, User};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait UserStore: Send + Sync {
    /// Finds a user by exact (case-sensitive) username.
    fn get(&self, username: &str) -> Result<Option<User>, ApiError>;
}

#[cfg_attr(test, automock)]
pub trait ApiKeyStore: Send + Sync {
    fn save(&self, api_key: &ApiKey) -> Result<(), ApiError>;

    /// All keys owned by `user_id`, oldest first.
    fn get_by_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, ApiError>;

    fn get_by_id(&self, id: Uuid) -> Result<Option<ApiKey>, ApiError>;

    /// Looks a key up by its token string.
    fn get_by_key(&self, key: &str) -> Result<Option<ApiKey>, ApiError>;

    fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), ApiError>;
}

#[cfg_attr(test, automock)]
pub trait TodoStore: Send + Sync {
    fn get_all(&self, user_id: Uuid) -> Result<Vec<TodoItem>, ApiError>;

    fn get(&self, id: Uuid) -> Result<Option<TodoItem>, ApiError>;

    /// Inserts the item, or replaces the stored one with the same id.
    fn save_or_update(&self, todo: &TodoItem) -> Result<(), ApiError>;

    fn delete(&self, id: Uuid) -> Result<(), ApiError>;
}
