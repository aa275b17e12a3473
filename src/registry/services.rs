//! Service traits a repository handle is wired from
//!
//! The synchronizer only talks to registries through these traits, so remote (HTTP)
//! and in-memory implementations are interchangeable.

use crate::error::Result;
use crate::manifest::{Descriptor, Manifest};
use crate::registry::reference::Reference;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of bytes for streaming blob reads
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[async_trait]
pub trait ManifestService: Send + Sync {
    /// Fetch a manifest by tag or digest. `accept` lists media types in priority
    /// order; the registry answers with whichever it supports.
    async fn get(&self, reference: &Reference, accept: &[&str]) -> Result<Manifest>;
}

#[async_trait]
pub trait TagService: Send + Sync {
    /// Every tag in the repository
    async fn all(&self) -> Result<Vec<String>>;

    /// Resolve a tag to the descriptor of the manifest it points at
    async fn get(&self, tag: &str) -> Result<Descriptor>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Blob metadata by digest; `RegistryError::NotFound` when absent
    async fn stat(&self, digest: &str) -> Result<Descriptor>;

    /// Streaming read of a blob's content
    async fn open(&self, digest: &str) -> Result<ByteStream>;

    /// Start a new write session
    async fn create(&self) -> Result<Box<dyn BlobWriter>>;
}

/// An in-progress blob upload, owned by whoever created it.
///
/// Nothing written becomes visible until `commit` succeeds. A session is finished
/// by exactly one successful `commit` or by `cancel`.
#[async_trait]
pub trait BlobWriter: Send {
    fn id(&self) -> &str;

    /// Bytes accepted so far
    fn size(&self) -> u64;

    async fn write(&mut self, chunk: Bytes) -> Result<()>;

    /// Finalize against the expected descriptor; fails when the written content's
    /// digest or size disagree with it.
    async fn commit(&mut self, expected: &Descriptor) -> Result<Descriptor>;

    /// Abandon the session; nothing is committed
    async fn cancel(&mut self) -> Result<()>;
}
