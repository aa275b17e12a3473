//! Configuration values for a sync run
//!
//! Every value here is assembled once (by the CLI or by a library caller) and is
//! read-only afterwards. Components receive them at construction.

use crate::error::handlers::ValidationErrorHandler;
use crate::error::{RegistryError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TLS handshake and connect budget for every registry connection
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout; blob transfers can be large
pub const DEFAULT_TIMEOUT_SECS: u64 = 7200;

/// Credentials presented to token endpoints via HTTP basic auth
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthConfig {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Basic auth is applied only when a non-empty username is configured
    pub fn has_credentials(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        ValidationErrorHandler::validate_credentials(&self.username, &self.password)
    }
}

/// Registry endpoint and transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub address: String,
    pub skip_tls: bool,
    pub timeout: u64,
}

impl RegistryConfig {
    pub fn new(address: String) -> Self {
        Self {
            address: address.trim_end_matches('/').to_string(),
            skip_tls: false,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.skip_tls = skip_tls;
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ValidationErrorHandler::validate_registry_url(&self.address)?;
        ValidationErrorHandler::validate_timeout(self.timeout)
    }

    /// Build the underlying HTTP client: no idle connection reuse, bounded
    /// connect time, optional acceptance of invalid certificates.
    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(self.timeout))
            .pool_max_idle_per_host(0);

        if self.skip_tls {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        builder
            .build()
            .map_err(|e| RegistryError::Network(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Behaviour switches for the synchronizer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Skip blobs whose digest the destination already reports with a matching size
    pub skip_existing: bool,
    /// Reuse bearer tokens per (realm, service, scope) until they expire
    pub cache_tokens: bool,
}
