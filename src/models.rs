use chrono::{DateTime, Duration, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    // Stored and compared as plain text.
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiKey {
    pub id: Uuid,
    pub key: String,
    pub user_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Per-user issuance rules for API keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiKeySettings {
    /// Maximum number of keys, active or not, a single user may own.
    pub api_key_limit: usize,
    pub expiration_minutes: i64,
}

impl ApiKeySettings {
    /// Expiry of a key issued at `issued_at`, `None` if it is out of range.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Duration::try_minutes(self.expiration_minutes)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
    }
}

impl Default for ApiKeySettings {
    fn default() -> Self {
        Self {
            api_key_limit: 5,
            expiration_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {}", other)),
        }
    }
}

impl ToSql for Difficulty {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TodoItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub is_done: bool,
    pub date_created: DateTime<Utc>,
}

// Request/Response models
#[derive(Debug, Deserialize)]
pub struct ApiKeyRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeysQuery {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKeyStateRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub api_key: String,
    pub user_id: Uuid,
    pub is_active: bool,
    pub date_created: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            api_key: key.key,
            user_id: key.user_id,
            is_active: key.is_active,
            date_created: key.created_at,
            expiration_date: key.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoItemRequest {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoItemRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItemResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub is_done: bool,
    pub date_created: DateTime<Utc>,
}

impl From<TodoItem> for TodoItemResponse {
    fn from(todo: TodoItem) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            difficulty: todo.difficulty,
            is_done: todo.is_done,
            date_created: todo.date_created,
        }
    }
}
