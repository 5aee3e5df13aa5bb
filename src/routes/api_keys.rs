use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::{ApiKeyRequest, ApiKeyResponse, ApiKeysQuery, UpdateKeyStateRequest},
    AppState,
};

pub async fn create_api_key(
    State(state): State<AppState>,
    Json(payload): Json<ApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let api_key = state
        .api_keys
        .create_api_key(&payload.username, &payload.password)?;

    Ok((StatusCode::CREATED, Json(ApiKeyResponse::from(api_key))))
}

pub async fn list_api_keys(
    State(state): State<AppState>,
    Query(query): Query<ApiKeysQuery>,
) -> Result<Json<Vec<ApiKeyResponse>>, ApiError> {
    let keys = state
        .api_keys
        .get_all_api_keys(&query.username, &query.password)?;

    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

pub async fn update_api_key_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateKeyStateRequest>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let api_key = state.api_keys.update_api_key_state(id, payload.is_active)?;
    Ok(Json(ApiKeyResponse::from(api_key)))
}
