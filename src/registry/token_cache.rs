//! Optional bearer token cache
//!
//! Tokens are keyed by the (realm, service, scope) triple of the challenge that
//! produced them and are reused until shortly before they expire. The cache only
//! saves the token fetch; every request is still pinged.

use crate::error::{RegistryError, Result};
use crate::registry::auth::Token;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Lifetime assumed when the token endpoint omits `expires_in`
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60);

/// Tokens are treated as expired this long before their actual expiry
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(10);

/// Upper bound on how long a token is reused, whatever `expires_in` claims
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    pub realm: String,
    pub service: String,
    pub scope: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: Token,
    expires_at: Instant,
}

/// Thread-safe token store shared by clones
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    entries: Arc<RwLock<HashMap<TokenKey, CachedToken>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a still-valid token for the key, if any
    pub fn get(&self, key: &TokenKey) -> Result<Option<Token>> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &TokenKey, now: Instant) -> Result<Option<Token>> {
        let guard = self.entries.read().map_err(|_| {
            RegistryError::Registry("Failed to acquire token cache read lock".to_string())
        })?;

        Ok(guard
            .get(key)
            .filter(|cached| now < cached.expires_at)
            .map(|cached| cached.token.clone()))
    }

    /// Store a token received at `received_at`
    pub fn insert(&self, key: TokenKey, token: Token, received_at: Instant) -> Result<()> {
        let lifetime = token
            .expires_in
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME)
            .min(MAX_TOKEN_LIFETIME)
            .saturating_sub(EXPIRY_MARGIN);
        let expires_at = received_at.checked_add(lifetime).unwrap_or(received_at);

        let mut guard = self.entries.write().map_err(|_| {
            RegistryError::Registry("Failed to acquire token cache write lock".to_string())
        })?;
        guard.insert(key, CachedToken { token, expires_at });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
