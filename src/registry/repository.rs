//! Repository handle
//!
//! Binds a validated repository name (and optional tag) on one registry endpoint to
//! the manifest, tag and blob services reached through one transport. The handle
//! only wires things together; it is immutable once built.

use crate::error::handlers::ValidationErrorHandler;
use crate::error::Result;
use crate::logging::Logger;
use crate::registry::reference::{validate_tag, RepositoryName};
use crate::registry::remote::{RegistryEndpoint, RemoteBlobStore, RemoteManifestService, RemoteTagService};
use crate::registry::services::{BlobStore, ManifestService, TagService};
use crate::registry::transport::HttpTransport;
use std::fmt;
use std::sync::Arc;
use url::Url;

#[derive(Clone)]
pub struct Repository {
    name: RepositoryName,
    tag: Option<String>,
    endpoint: Option<Url>,
    manifests: Arc<dyn ManifestService>,
    tags: Arc<dyn TagService>,
    blobs: Arc<dyn BlobStore>,
}

impl Repository {
    /// Handle for `name` on the registry at `endpoint`, talking through `transport`.
    ///
    /// Name, tag and endpoint are validated before anything touches the network.
    pub fn new(
        name: &str,
        tag: Option<&str>,
        endpoint: &str,
        transport: Arc<dyn HttpTransport>,
        output: Logger,
    ) -> Result<Self> {
        let name = RepositoryName::parse(name)?;
        if let Some(tag) = tag {
            validate_tag(tag)?;
        }
        let base = ValidationErrorHandler::validate_registry_url(endpoint)?;

        let remote = Arc::new(RegistryEndpoint::new(base.clone(), name.clone(), transport, output));

        Ok(Self {
            name,
            tag: tag.map(str::to_string),
            endpoint: Some(base),
            manifests: Arc::new(RemoteManifestService::new(remote.clone())),
            tags: Arc::new(RemoteTagService::new(remote.clone())),
            blobs: Arc::new(RemoteBlobStore::new(remote)),
        })
    }

    /// Handle around arbitrary service implementations
    pub fn from_parts(
        name: &str,
        manifests: Arc<dyn ManifestService>,
        tags: Arc<dyn TagService>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self> {
        Ok(Self {
            name: RepositoryName::parse(name)?,
            tag: None,
            endpoint: None,
            manifests,
            tags,
            blobs,
        })
    }

    pub fn name(&self) -> &RepositoryName {
        &self.name
    }

    /// Tag the handle was bound to, used when a sync names no tags
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Registry base URL; `None` for handles built from parts
    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    pub fn manifests(&self) -> &dyn ManifestService {
        self.manifests.as_ref()
    }

    pub fn tags(&self) -> &dyn TagService {
        self.tags.as_ref()
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .finish()
    }
}
