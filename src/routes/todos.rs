use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    models::{CreateTodoItemRequest, TodoItem, TodoItemResponse, UpdateTodoItemRequest},
    AppState,
};

// Items owned by someone else are reported as missing.
fn find_owned(state: &AppState, id: Uuid, user: &AuthenticatedUser) -> Result<TodoItem, ApiError> {
    state
        .todos
        .get(id)?
        .filter(|todo| todo.user_id == user.user_id)
        .ok_or(ApiError::TodoNotFound(id))
}

pub async fn list_todos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<TodoItemResponse>>, ApiError> {
    if let Some(release_date) = state.todos_release_date {
        if Utc::now().date_naive() < release_date {
            return Err(ApiError::FeatureNotReleased);
        }
    }

    let todos = state.todos.get_all(user.user_id)?;
    Ok(Json(todos.into_iter().map(TodoItemResponse::from).collect()))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TodoItemResponse>, ApiError> {
    let todo = find_owned(&state, id, &user)?;
    Ok(Json(todo.into()))
}

pub async fn create_todo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateTodoItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = TodoItem {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        title: payload.title,
        description: payload.description,
        difficulty: payload.difficulty,
        is_done: false,
        date_created: Utc::now(),
    };

    state.todos.save_or_update(&todo)?;
    tracing::info!("Created todo {} for user {}", todo.id, user.user_id);

    let location = format!("/todos/{}", todo.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(TodoItemResponse::from(todo)),
    ))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTodoItemRequest>,
) -> Result<Json<TodoItemResponse>, ApiError> {
    let mut todo = find_owned(&state, id, &user)?;
    todo.title = payload.title;
    todo.description = payload.description;

    state.todos.save_or_update(&todo)?;
    Ok(Json(todo.into()))
}

pub async fn toggle_todo_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TodoItemResponse>, ApiError> {
    let mut todo = find_owned(&state, id, &user)?;
    todo.is_done = !todo.is_done;

    state.todos.save_or_update(&todo)?;
    Ok(Json(todo.into()))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    find_owned(&state, id, &user)?;

    state.todos.delete(id)?;
    tracing::info!("Deleted todo {}", id);
    Ok(StatusCode::NO_CONTENT)
}
