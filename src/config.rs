use crate::errors::ApiError;
use crate::models::ApiKeySettings;
use chrono::{NaiveDate, Utc};
use std::env;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: SocketAddr,
    pub database_path: String,
    pub api_key_prefix: String,
    pub api_keys: ApiKeySettings,
    /// `GET /todos` answers "Feature not released" before this date.
    pub todos_release_date: Option<NaiveDate>,
}

impl Config {
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` reads the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiKeySettings::default();

        let api_key_prefix = lookup("API_KEY_PREFIX").unwrap_or_else(|| "todo".to_string());
        if api_key_prefix.is_empty() {
            return Err(ApiError::Config("API_KEY_PREFIX must not be empty".to_string()));
        }

        let api_keys = ApiKeySettings {
            api_key_limit: parse_or(&lookup, "API_KEY_LIMIT", defaults.api_key_limit)?,
            expiration_minutes: parse_or(
                &lookup,
                "API_KEY_EXPIRATION_MINUTES",
                defaults.expiration_minutes,
            )?,
        };
        if api_keys.expiration_minutes <= 0 || api_keys.expires_at(Utc::now()).is_none() {
            return Err(ApiError::Config(format!(
                "Invalid value for API_KEY_EXPIRATION_MINUTES: {} is out of range",
                api_keys.expiration_minutes
            )));
        }

        Ok(Self {
            server_address: parse_or(
                &lookup,
                "SERVER_ADDRESS",
                SocketAddr::from(([127, 0, 0, 1], 3000)),
            )?,
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "db/todos.db".to_string()),
            api_key_prefix,
            api_keys,
            todos_release_date: parse_opt(&lookup, "TODOS_RELEASE_DATE")?,
        })
    }
}

fn parse_opt<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ApiError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ApiError::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(None),
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ApiError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(lookup, name)?.unwrap_or(default))
}
