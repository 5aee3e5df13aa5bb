use crate::errors::ApiError;
use crate::models::{ApiKey, TodoItem, User};
use crate::store::{ApiKeyStore, TodoStore, UserStore};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const API_KEY_COLUMNS: &str = "id, api_key, user_id, is_active, date_created, expiration_date";
const TODO_COLUMNS: &str = "id, user_id, title, description, difficulty, is_done, date_created";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, ApiError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("../db/schema.sql"))?;
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.conn.lock().map_err(|_| ApiError::Internal)
    }

    // Users are provisioned outside the HTTP surface.
    pub fn create_user(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password: password.to_string(),
        };
        self.conn()?.execute(
            "INSERT INTO users (id, username, password) VALUES (?, ?, ?)",
            params![user.id, user.username, user.password],
        )?;
        Ok(user)
    }
}

fn api_key_from_row(row: &Row<'_>) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        id: row.get(0)?,
        key: row.get(1)?,
        user_id: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
        expires_at: row.get(5)?,
    })
}

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<TodoItem> {
    Ok(TodoItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        difficulty: row.get(4)?,
        is_done: row.get(5)?,
        date_created: row.get(6)?,
    })
}

impl UserStore for Database {
    fn get(&self, username: &str) -> Result<Option<User>, ApiError> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password FROM users WHERE username = ?",
                params![username],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

impl ApiKeyStore for Database {
    fn save(&self, api_key: &ApiKey) -> Result<(), ApiError> {
        self.conn()?.execute(
            &format!("INSERT INTO api_keys ({}) VALUES (?, ?, ?, ?, ?, ?)", API_KEY_COLUMNS),
            params![
                api_key.id,
                api_key.key,
                api_key.user_id,
                api_key.is_active,
                api_key.created_at,
                api_key.expires_at
            ],
        )?;
        Ok(())
    }

    fn get_by_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, ApiError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM api_keys WHERE user_id = ? ORDER BY date_created, rowid",
            API_KEY_COLUMNS
        ))?;
        let keys = stmt
            .query_map(params![user_id], api_key_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn get_by_id(&self, id: Uuid) -> Result<Option<ApiKey>, ApiError> {
        let conn = self.conn()?;
        let key = conn
            .query_row(
                &format!("SELECT {} FROM api_keys WHERE id = ?", API_KEY_COLUMNS),
                params![id],
                api_key_from_row,
            )
            .optional()?;
        Ok(key)
    }

    fn get_by_key(&self, key: &str) -> Result<Option<ApiKey>, ApiError> {
        let conn = self.conn()?;
        let key = conn
            .query_row(
                &format!("SELECT {} FROM api_keys WHERE api_key = ?", API_KEY_COLUMNS),
                params![key],
                api_key_from_row,
            )
            .optional()?;
        Ok(key)
    }

    fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), ApiError> {
        self.conn()?.execute(
            "UPDATE api_keys SET is_active = ? WHERE id = ?",
            params![is_active, id],
        )?;
        Ok(())
    }
}

impl TodoStore for Database {
    fn get_all(&self, user_id: Uuid) -> Result<Vec<TodoItem>, ApiError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM todos WHERE user_id = ? ORDER BY date_created, rowid",
            TODO_COLUMNS
        ))?;
        let todos = stmt
            .query_map(params![user_id], todo_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    fn get(&self, id: Uuid) -> Result<Option<TodoItem>, ApiError> {
        let conn = self.conn()?;
        let todo = conn
            .query_row(
                &format!("SELECT {} FROM todos WHERE id = ?", TODO_COLUMNS),
                params![id],
                todo_from_row,
            )
            .optional()?;
        Ok(todo)
    }

    fn save_or_update(&self, todo: &TodoItem) -> Result<(), ApiError> {
        self.conn()?.execute(
            &format!(
                "INSERT INTO todos ({}) VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     description = excluded.description,
                     difficulty = excluded.difficulty,
                     is_done = excluded.is_done",
                TODO_COLUMNS
            ),
            params![
                todo.id,
                todo.user_id,
                todo.title,
                todo.description,
                todo.difficulty,
                todo.is_done,
                todo.date_created
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.conn()?
            .execute("DELETE FROM todos WHERE id = ?", params![id])?;
        Ok(())
    }
}
