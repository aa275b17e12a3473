//! In-memory blob store
//!
//! Holds blobs keyed by digest. Commits verify size and sha256 digest of the
//! written bytes before anything becomes visible; committing a digest that is
//! already present keeps the existing blob.

use crate::digest::DigestVerifier;
use crate::error::{RegistryError, Result};
use crate::manifest::Descriptor;
use crate::registry::services::{BlobStore, BlobWriter, ByteStream};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Chunk size used when streaming blobs back out
const READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Bytes>>>,
    read_chunk_size: Option<usize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream reads in chunks of `size` bytes
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = Some(size.max(1));
        self
    }

    /// Store `data` directly under its sha256 digest
    pub fn insert(&self, data: impl Into<Bytes>) -> Result<Descriptor> {
        let data = data.into();
        let digest = crate::digest::DigestUtils::compute_docker_digest(&data);
        let descriptor = Descriptor::new(digest.clone(), data.len() as u64, DEFAULT_MEDIA_TYPE);
        self.write_lock()?.entry(digest).or_insert(data);
        Ok(descriptor)
    }

    pub fn get(&self, digest: &str) -> Result<Option<Bytes>> {
        Ok(self.read_lock()?.get(digest).cloned())
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.read_lock().map(|blobs| blobs.contains_key(digest)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.read_lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Bytes>>> {
        self.blobs
            .read()
            .map_err(|_| RegistryError::Registry("Failed to acquire blob store read lock".to_string()))
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Bytes>>> {
        self.blobs
            .write()
            .map_err(|_| RegistryError::Registry("Failed to acquire blob store write lock".to_string()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn stat(&self, digest: &str) -> Result<Descriptor> {
        match self.get(digest)? {
            Some(data) => Ok(Descriptor::new(digest, data.len() as u64, DEFAULT_MEDIA_TYPE)),
            None => Err(RegistryError::NotFound(format!("blob {}", digest))),
        }
    }

    async fn open(&self, digest: &str) -> Result<ByteStream> {
        let data = self
            .get(digest)?
            .ok_or_else(|| RegistryError::NotFound(format!("blob {}", digest)))?;
        let chunk_size = self.read_chunk_size.unwrap_or(READ_CHUNK_SIZE);

        let chunks: Vec<Result<Bytes>> = (0..data.len())
            .step_by(chunk_size)
            .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn create(&self) -> Result<Box<dyn BlobWriter>> {
        Ok(Box::new(MemoryBlobWriter {
            id: uuid::Uuid::new_v4().to_string(),
            store: self.clone(),
            buffer: BytesMut::new(),
            finished: false,
        }))
    }
}

pub struct MemoryBlobWriter {
    id: String,
    store: MemoryBlobStore,
    buffer: BytesMut,
    finished: bool,
}

impl MemoryBlobWriter {
    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(RegistryError::Registry(format!("Write session {} is already finished", self.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobWriter for MemoryBlobWriter {
    fn id(&self) -> &str {
        &self.id
    }

    fn size(&self) -> u64 {
        self.buffer.len() as u64
    }

    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        self.ensure_open()?;
        self.buffer.extend_from_slice(&chunk);
        Ok(())
    }

    async fn commit(&mut self, expected: &Descriptor) -> Result<Descriptor> {
        self.ensure_open()?;
        // A failed commit ends the session as well
        self.finished = true;

        let written = self.buffer.len() as u64;
        if expected.has_known_size() && written != expected.size {
            return Err(RegistryError::Verification(format!(
                "Size mismatch for {}: expected {} bytes, received {}",
                expected.digest, expected.size, written
            )));
        }

        let mut verifier = DigestVerifier::new(&expected.digest)?;
        verifier.update(&self.buffer);
        verifier.verify()?;

        let data = std::mem::take(&mut self.buffer).freeze();
        self.store.write_lock()?.entry(expected.digest.clone()).or_insert(data);

        Ok(Descriptor::new(expected.digest.clone(), written, expected.media_type.clone()))
    }

    async fn cancel(&mut self) -> Result<()> {
        self.finished = true;
        self.buffer.clear();
        Ok(())
    }
}
