//! Registry Sync Library
//!
//! Copies the blobs referenced by a repository's tags from one Docker registry to
//! another, authenticating through the registry bearer-token challenge.

pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod registry;
pub mod sync;

pub use config::{AuthConfig, RegistryConfig, SyncOptions};
pub use error::{RegistryError, Result};
pub use logging::Logger;
