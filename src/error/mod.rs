//! Error types and handlers for registry sync operations

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Malformed configuration: repository names, tags, endpoints, realm URLs
    #[error("Validation error: {0}")]
    Validation(String),
    /// Challenge or token endpoint failures
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Connection, TLS and timeout failures
    #[error("Network error: {0}")]
    Network(String),
    /// Unexpected registry protocol responses
    #[error("Registry error: {0}")]
    Registry(String),
    /// Manifest or blob missing
    #[error("Not found: {0}")]
    NotFound(String),
    /// Digest or size disagreement between declared and actual content
    #[error("Verification error: {0}")]
    Verification(String),
    /// Malformed or unsupported documents
    #[error("Parse error: {0}")]
    Parse(String),
    /// Local IO errors
    #[error("IO error: {0}")]
    Io(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        handlers::NetworkErrorHandler::handle_network_error(&err, "request")
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::Validation(err.to_string())
    }
}
