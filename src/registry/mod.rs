//! Registry module for Docker registry interactions
//!
//! This module provides the transport, bearer authentication and repository
//! services used to talk to a Docker Registry HTTP API v2 endpoint.

pub mod auth;
pub mod challenge;
pub mod memory;
pub mod reference;
pub mod remote;
pub mod repository;
pub mod services;
pub mod token_cache;
pub mod transport;

pub use crate::config::AuthConfig;
pub use auth::{Token, TokenModifier};
pub use challenge::Challenge;
pub use memory::MemoryBlobStore;
pub use reference::{Reference, RepositoryName};
pub use repository::Repository;
pub use services::{BlobStore, BlobWriter, ByteStream, ManifestService, TagService};
pub use token_cache::TokenCache;
pub use transport::{HttpTransport, RequestModifier, Transport};
