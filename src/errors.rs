use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("User with Username: '{0}' does not exists!")]
    UserNotFound(String),

    #[error("Wrong password for user: '{0}'")]
    InvalidCredentials(String),

    #[error("Api key limit is reached")]
    QuotaExceeded,

    #[error("Api key with Id: '{0}' does not exists")]
    KeyNotFound(Uuid),

    #[error("Todo item with id: '{0}' does not exist")]
    TodoNotFound(Uuid),

    #[error("API key is required")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API key is inactive")]
    KeyInactive,

    #[error("API key expired")]
    KeyExpired,

    #[error("Feature not released")]
    FeatureNotReleased,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UserNotFound(_) | ApiError::KeyNotFound(_) | ApiError::TodoNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::InvalidCredentials(_)
            | ApiError::QuotaExceeded
            | ApiError::FeatureNotReleased => StatusCode::BAD_REQUEST,
            ApiError::MissingApiKey
            | ApiError::InvalidApiKey
            | ApiError::KeyInactive
            | ApiError::KeyExpired => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) | ApiError::Config(_) | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
            return (status, ApiError::Internal.to_string()).into_response();
        }
        (status, self.to_string()).into_response()
    }
}
