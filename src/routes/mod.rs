pub mod api_keys;
pub mod todos;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::require_api_key;
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let todos = Router::new()
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/todos/:id",
            get(todos::get_todo)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route("/todos/:id/toggleStatus", patch(todos::toggle_todo_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route(
            "/apiKeys",
            post(api_keys::create_api_key).get(api_keys::list_api_keys),
        )
        .route("/apiKeys/:id/isActive", put(api_keys::update_api_key_state))
        .merge(todos)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
