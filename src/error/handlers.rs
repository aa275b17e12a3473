//! Standardized error handling patterns shared by the HTTP services

use crate::error::{RegistryError, Result};
use reqwest::{Response, StatusCode};

/// Standard error handler for HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Drain a failed response into a short error text
    pub async fn error_text(response: Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string())
    }

    /// Handle upload-session related HTTP errors
    pub fn handle_upload_error(status: StatusCode, error_text: &str, context: &str) -> RegistryError {
        match status.as_u16() {
            400 if error_text.contains("DIGEST_INVALID") => RegistryError::Verification(format!(
                "Registry reports uploaded content doesn't match expected digest during {}: {}",
                context, error_text
            )),
            400 if error_text.contains("SIZE_INVALID") => RegistryError::Verification(format!(
                "Registry reports uploaded size doesn't match expected size during {}: {}",
                context, error_text
            )),
            400 => RegistryError::Registry(format!("Bad request during {}: {}", context, error_text)),
            401 => RegistryError::Auth(format!("Authentication failed during {}: {}", context, error_text)),
            403 => RegistryError::Auth(format!("Permission denied for {}: {}", context, error_text)),
            404 => RegistryError::NotFound(format!(
                "Repository not found or {} session expired: {}",
                context, error_text
            )),
            416 => RegistryError::Registry(format!("Invalid content range during {}: {}", context, error_text)),
            507 => RegistryError::Registry(format!("Registry out of storage during {}: {}", context, error_text)),
            _ => RegistryError::Registry(format!("{} failed (status {}): {}", context, status, error_text)),
        }
    }

    /// Handle token endpoint HTTP errors
    pub fn handle_auth_error(status: StatusCode, error_text: &str) -> RegistryError {
        let error_msg = match status.as_u16() {
            400 => format!("Invalid token request parameters: {}", error_text),
            401 => format!("Invalid credentials provided: {}", error_text),
            403 => format!("Access denied - insufficient permissions: {}", error_text),
            404 => format!("Authentication endpoint not found: {}", error_text),
            _ => format!("Token request failed (status {}): {}", status, error_text),
        };

        RegistryError::Auth(error_msg)
    }

    /// Handle registry-related HTTP errors
    pub fn handle_registry_error(status: StatusCode, error_text: &str, operation: &str) -> RegistryError {
        match status.as_u16() {
            401 => RegistryError::Auth(format!(
                "Unauthorized to perform {} operation: {}",
                operation, error_text
            )),
            403 => RegistryError::Auth(format!(
                "Forbidden: insufficient permissions for {}: {}",
                operation, error_text
            )),
            404 => RegistryError::NotFound(format!("{}: {}", operation, error_text)),
            429 => RegistryError::Registry(format!("Rate limited during {}: {}", operation, error_text)),
            500 => RegistryError::Registry(format!("Registry server error during {}: {}", operation, error_text)),
            502 | 503 => RegistryError::Registry(format!("Registry unavailable for {}: {}", operation, error_text)),
            _ => RegistryError::Registry(format!("{} failed (status {}): {}", operation, status, error_text)),
        }
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> RegistryError {
        if error.is_timeout() {
            RegistryError::Network(format!("{} timeout: {}", context, error))
        } else if error.is_connect() {
            RegistryError::Network(format!("Connection error during {}: {}", context, error))
        } else if error.is_decode() {
            RegistryError::Parse(format!("Failed to decode {} response: {}", context, error))
        } else if error.to_string().contains("certificate") {
            RegistryError::Network(format!("TLS certificate error during {}: {}", context, error))
        } else {
            RegistryError::Network(format!("{} network error: {}", context, error))
        }
    }
}

/// Validation error utilities
pub struct ValidationErrorHandler;

impl ValidationErrorHandler {
    /// Registry endpoints must be absolute http(s) URLs
    pub fn validate_registry_url(address: &str) -> Result<url::Url> {
        if address.is_empty() {
            return Err(RegistryError::Validation(
                "Registry address cannot be empty".to_string(),
            ));
        }

        let url = url::Url::parse(address)
            .map_err(|e| RegistryError::Validation(format!("Invalid registry address {}: {}", address, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RegistryError::Validation(format!(
                "Invalid registry address: {}. Must start with http:// or https://",
                address
            )));
        }

        Ok(url)
    }

    /// Standard credential validation
    pub fn validate_credentials(username: &Option<String>, password: &Option<String>) -> Result<()> {
        match (username, password) {
            (None, Some(_)) => Err(RegistryError::Validation(
                "Username is required when password is provided".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Standard numeric range validation
    pub fn validate_timeout(timeout: u64) -> Result<()> {
        if timeout == 0 {
            return Err(RegistryError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if timeout > 86400 {
            return Err(RegistryError::Validation(
                "Timeout cannot exceed 24 hours (86400 seconds)".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_404_maps_to_not_found() {
        let err = HttpErrorHandler::handle_registry_error(StatusCode::NOT_FOUND, "MANIFEST_UNKNOWN", "manifest fetch");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_digest_invalid_maps_to_verification() {
        let err = HttpErrorHandler::handle_upload_error(StatusCode::BAD_REQUEST, "DIGEST_INVALID", "blob commit");
        assert!(matches!(err, RegistryError::Verification(_)));
    }

    #[test]
    fn test_validate_registry_url() {
        assert!(ValidationErrorHandler::validate_registry_url("https://registry-1.docker.io").is_ok());
        assert!(ValidationErrorHandler::validate_registry_url("http://192.168.1.33:5000").is_ok());
        assert!(ValidationErrorHandler::validate_registry_url("ftp://example.com").is_err());
        assert!(ValidationErrorHandler::validate_registry_url("registry.example").is_err());
        assert!(ValidationErrorHandler::validate_registry_url("").is_err());
    }

    #[test]
    fn test_validate_credentials() {
        assert!(ValidationErrorHandler::validate_credentials(&None, &None).is_ok());
        assert!(ValidationErrorHandler::validate_credentials(&Some("user".into()), &None).is_ok());
        assert!(ValidationErrorHandler::validate_credentials(&None, &Some("pass".into())).is_err());
    }
}
