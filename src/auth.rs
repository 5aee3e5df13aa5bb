use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::AppState;

pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Owner of the API key that authenticated the current request.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub api_key_id: Uuid,
}

pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = extract_api_key(request.headers()).ok_or(ApiError::MissingApiKey)?;

    let api_key = state.api_keys.validate_api_key(&presented)?;
    tracing::debug!("Authenticated user {} with api key {}", api_key.user_id, api_key.id);

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: api_key.user_id,
        api_key_id: api_key.id,
    });

    Ok(next.run(request).await)
}

// `X-Api-Key` wins over `Authorization: Bearer`
fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
