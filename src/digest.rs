//! SHA256 digest utilities for content-addressed blobs
//!
//! Digests have the `<algorithm>:<hex>` form. Every algorithm registries commonly use is
//! accepted syntactically, but only `sha256` content can be verified locally.

use crate::error::{RegistryError, Result};
use sha2::{Digest, Sha256};

pub const SHA256_PREFIX: &str = "sha256:";

/// Utilities for working with digests
pub struct DigestUtils;

impl DigestUtils {
    /// Compute SHA256 hex digest from byte data
    pub fn compute_sha256(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Compute full digest (with sha256: prefix) from byte data
    pub fn compute_docker_digest(data: &[u8]) -> String {
        format!("{}{}", SHA256_PREFIX, Self::compute_sha256(data))
    }

    /// Validate SHA256 hex string (64 characters, all lowercase hex)
    pub fn is_valid_sha256_hex(digest: &str) -> bool {
        digest.len() == 64 && digest.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
    }

    /// Validate full sha256 digest format (sha256:xxxxx)
    pub fn is_valid_docker_digest(digest: &str) -> bool {
        digest
            .strip_prefix(SHA256_PREFIX)
            .is_some_and(Self::is_valid_sha256_hex)
    }

    /// Validate the general `<algorithm>:<encoded>` digest grammar
    pub fn validate(digest: &str) -> Result<()> {
        let Some((algorithm, encoded)) = digest.split_once(':') else {
            return Err(RegistryError::Validation(format!(
                "Digest missing algorithm prefix: {}",
                digest
            )));
        };

        let algorithm_ok = !algorithm.is_empty()
            && algorithm
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-'));
        let encoded_ok = !encoded.is_empty()
            && encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '=' | '_' | '-'));

        if !algorithm_ok || !encoded_ok {
            return Err(RegistryError::Validation(format!("Invalid digest format: {}", digest)));
        }

        if algorithm == "sha256" && !Self::is_valid_sha256_hex(encoded) {
            return Err(RegistryError::Validation(format!(
                "Invalid SHA256 digest: expected 64 hex characters, got '{}'",
                encoded
            )));
        }

        Ok(())
    }

    /// Shortened digest for log lines
    pub fn short(digest: &str) -> &str {
        let end = digest
            .find(':')
            .map(|pos| (pos + 13).min(digest.len()))
            .unwrap_or(digest.len().min(12));
        &digest[..end]
    }
}

/// Incremental verifier: hashes bytes as they stream past and checks the result
/// against an expected digest at the end.
#[derive(Clone)]
pub struct DigestVerifier {
    expected: String,
    hasher: Sha256,
}

impl DigestVerifier {
    pub fn new(expected_digest: &str) -> Result<Self> {
        if !DigestUtils::is_valid_docker_digest(expected_digest) {
            return Err(RegistryError::Verification(format!(
                "Unsupported digest for local verification: {}",
                expected_digest
            )));
        }

        Ok(Self {
            expected: expected_digest.to_string(),
            hasher: Sha256::new(),
        })
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Digest of everything seen so far
    pub fn current_digest(&self) -> String {
        format!("{}{}", SHA256_PREFIX, hex::encode(self.hasher.clone().finalize()))
    }

    pub fn verify(&self) -> Result<()> {
        let computed = self.current_digest();
        if computed != self.expected {
            return Err(RegistryError::Verification(format!(
                "Data integrity check failed: expected {}, computed {}",
                self.expected, computed
            )));
        }
        Ok(())
    }
}
