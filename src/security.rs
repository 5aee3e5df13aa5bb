use crate::errors::ApiError;
use crate::models::{ApiKey, ApiKeySettings, User};
use crate::store::{ApiKeyStore, UserStore};
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

const BASE32: base32::Alphabet = base32::Alphabet::RFC4648 { padding: false };
const RANDOM_BYTES: usize = 20;
const CHECKSUM_BYTES: usize = 4;

/// Issues opaque API key tokens of the form `prefix_random_checksum`.
#[derive(Debug, Clone)]
pub struct ApiKeyGenerator {
    prefix: String,
}

impl ApiKeyGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    // 160 random bits plus the first 4 bytes of a SHA-256 checksum
    pub fn generate(&self) -> String {
        let mut random_bytes = [0u8; RANDOM_BYTES];
        rand::thread_rng().fill(&mut random_bytes);

        let checksum = checksum(&self.prefix, &random_bytes);

        format!(
            "{}_{}_{}",
            self.prefix,
            base32::encode(BASE32, &random_bytes),
            base32::encode(BASE32, &checksum)
        )
    }

    /// Checks prefix and checksum without any store lookup.
    pub fn validate_format(&self, key: &str) -> Result<(), ApiError> {
        let mut parts = key.rsplitn(3, '_');
        let (checksum_part, random_part, prefix) = match (parts.next(), parts.next(), parts.next())
        {
            (Some(c), Some(r), Some(p)) => (c, r, p),
            _ => return Err(ApiError::InvalidApiKey),
        };

        if prefix != self.prefix {
            return Err(ApiError::InvalidApiKey);
        }

        let random_bytes = base32::decode(BASE32, random_part).ok_or(ApiError::InvalidApiKey)?;
        if random_bytes.len() != RANDOM_BYTES {
            return Err(ApiError::InvalidApiKey);
        }

        let provided = base32::decode(BASE32, checksum_part).ok_or(ApiError::InvalidApiKey)?;
        if provided != checksum(prefix, &random_bytes) {
            return Err(ApiError::InvalidApiKey);
        }

        Ok(())
    }
}

fn checksum(prefix: &str, random_bytes: &[u8]) -> [u8; CHECKSUM_BYTES] {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(random_bytes);
    let digest = hasher.finalize();

    let mut out = [0u8; CHECKSUM_BYTES];
    out.copy_from_slice(&digest[..CHECKSUM_BYTES]);
    out
}

// Passwords are stored in plain text; compare in constant time at least.
fn password_matches(stored: &str, provided: &str) -> bool {
    stored.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[derive(Clone)]
pub struct ApiKeyService {
    users: Arc<dyn UserStore>,
    keys: Arc<dyn ApiKeyStore>,
    generator: ApiKeyGenerator,
    settings: ApiKeySettings,
}

impl ApiKeyService {
    pub fn new(
        users: Arc<dyn UserStore>,
        keys: Arc<dyn ApiKeyStore>,
        generator: ApiKeyGenerator,
        settings: ApiKeySettings,
    ) -> Self {
        Self {
            users,
            keys,
            generator,
            settings,
        }
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let user = self
            .users
            .get(username)?
            .ok_or_else(|| ApiError::UserNotFound(username.to_string()))?;

        if !password_matches(&user.password, password) {
            warn!("Rejected credentials for user '{}'", user.username);
            return Err(ApiError::InvalidCredentials(user.username));
        }

        Ok(user)
    }

    pub fn create_api_key(&self, username: &str, password: &str) -> Result<ApiKey, ApiError> {
        let user = self.authenticate(username, password)?;

        // Not atomic with the insert below: concurrent requests may overshoot the limit.
        let existing = self.keys.get_by_user(user.id)?;
        if existing.len() >= self.settings.api_key_limit {
            warn!(
                "Api key limit reached for user '{}' ({} keys)",
                user.username,
                existing.len()
            );
            return Err(ApiError::QuotaExceeded);
        }

        let now = Utc::now();
        let expires_at = self.settings.expires_at(now).ok_or_else(|| {
            ApiError::Config(format!(
                "api key expiration of {} minutes is out of range",
                self.settings.expiration_minutes
            ))
        })?;
        let api_key = ApiKey {
            id: Uuid::new_v4(),
            key: self.generator.generate(),
            user_id: user.id,
            is_active: true,
            created_at: now,
            expires_at,
        };

        self.keys.save(&api_key)?;
        info!("Issued api key {} for user {}", api_key.id, user.id);

        Ok(api_key)
    }

    pub fn get_all_api_keys(&self, username: &str, password: &str) -> Result<Vec<ApiKey>, ApiError> {
        let user = self.authenticate(username, password)?;
        self.keys.get_by_user(user.id)
    }

    pub fn update_api_key_state(&self, id: Uuid, is_active: bool) -> Result<ApiKey, ApiError> {
        let mut api_key = self.keys.get_by_id(id)?.ok_or(ApiError::KeyNotFound(id))?;

        self.keys.set_active(id, is_active)?;
        api_key.is_active = is_active;
        info!("Api key {} is_active set to {}", id, is_active);

        Ok(api_key)
    }

    /// Resolves a presented token to a usable key record.
    pub fn validate_api_key(&self, key: &str) -> Result<ApiKey, ApiError> {
        self.generator.validate_format(key)?;

        let api_key = self.keys.get_by_key(key)?.ok_or(ApiError::InvalidApiKey)?;

        if !api_key.is_active {
            debug!("Api key {} is inactive", api_key.id);
            return Err(ApiError::KeyInactive);
        }

        if api_key.is_expired(Utc::now()) {
            debug!("Api key {} expired at {}", api_key.id, api_key.expires_at);
            return Err(ApiError::KeyExpired);
        }

        Ok(api_key)
    }
}
