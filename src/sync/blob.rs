//! Blob synchronizer
//!
//! Copies one descriptor's content from a source blob store into a destination
//! blob store: stat at the source, stream exactly the expected number of bytes
//! into a destination write session, then commit against the descriptor so the
//! destination can verify digest and size. Any failure cancels the session.

use crate::config::SyncOptions;
use crate::digest::DigestUtils;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::manifest::Descriptor;
use crate::registry::services::{BlobStore, BlobWriter, ByteStream};
use futures::StreamExt;

/// What happened to one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobSyncOutcome {
    /// Streamed and committed at the destination
    Copied(Descriptor),
    /// Already present at the destination; only with `skip_existing`
    Skipped(Descriptor),
}

impl BlobSyncOutcome {
    pub fn descriptor(&self) -> &Descriptor {
        match self {
            BlobSyncOutcome::Copied(descriptor) | BlobSyncOutcome::Skipped(descriptor) => descriptor,
        }
    }

    pub fn is_copied(&self) -> bool {
        matches!(self, BlobSyncOutcome::Copied(_))
    }
}

pub struct BlobSynchronizer {
    options: SyncOptions,
    output: Logger,
}

impl BlobSynchronizer {
    pub fn new(options: SyncOptions, output: Logger) -> Self {
        Self { options, output }
    }

    pub async fn sync_blob(
        &self,
        source: &dyn BlobStore,
        destination: &dyn BlobStore,
        descriptor: &Descriptor,
    ) -> Result<BlobSyncOutcome> {
        let short = DigestUtils::short(&descriptor.digest);

        let source_stat = source.stat(&descriptor.digest).await.map_err(|e| match e {
            RegistryError::NotFound(_) => RegistryError::NotFound(format!(
                "blob {} referenced by the manifest is missing from the source",
                descriptor.digest
            )),
            other => other,
        })?;
        let expected = Self::expected_descriptor(descriptor, &source_stat)?;

        if self.options.skip_existing {
            if let Some(existing) = self.existing(destination, &expected).await? {
                self.output.detail(&format!("Blob {} already exists, skipping", short));
                return Ok(BlobSyncOutcome::Skipped(existing));
            }
        }

        self.output.verbose(&format!(
            "Copying blob {} ({})",
            short,
            self.output.format_size(expected.size)
        ));

        let reader = source.open(&expected.digest).await?;
        let mut writer = destination.create().await?;
        self.output.trace(&format!("Write session {} opened for {}", writer.id(), short));

        match Self::transfer(reader, writer.as_mut(), &expected).await {
            Ok(committed) => {
                self.output.detail(&format!(
                    "Committed blob {} ({})",
                    short,
                    self.output.format_size(committed.size)
                ));
                Ok(BlobSyncOutcome::Copied(committed))
            }
            Err(e) => {
                if let Err(cancel_err) = writer.cancel().await {
                    self.output.warning(&format!(
                        "Failed to cancel write session {}: {}",
                        writer.id(),
                        cancel_err
                    ));
                }
                Err(e)
            }
        }
    }

    /// Descriptor the destination must end up with: the declared one, with the
    /// source size filled in when the declared size is unknown.
    fn expected_descriptor(declared: &Descriptor, source_stat: &Descriptor) -> Result<Descriptor> {
        if declared.has_known_size() && declared.size != source_stat.size {
            return Err(RegistryError::Verification(format!(
                "Size mismatch for {}: manifest declares {} bytes, source has {}",
                declared.digest, declared.size, source_stat.size
            )));
        }

        let size = if declared.has_known_size() {
            declared.size
        } else {
            source_stat.size
        };
        let media_type = if declared.media_type.is_empty() {
            source_stat.media_type.clone()
        } else {
            declared.media_type.clone()
        };

        Ok(Descriptor::new(declared.digest.clone(), size, media_type))
    }

    async fn existing(&self, destination: &dyn BlobStore, expected: &Descriptor) -> Result<Option<Descriptor>> {
        match destination.stat(&expected.digest).await {
            Ok(existing) if existing.size == expected.size => Ok(Some(existing)),
            Ok(existing) => {
                self.output.warning(&format!(
                    "Destination reports {} with {} bytes, expected {}; copying again",
                    expected.digest, existing.size, expected.size
                ));
                Ok(None)
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn transfer(reader: ByteStream, writer: &mut dyn BlobWriter, expected: &Descriptor) -> Result<Descriptor> {
        copy_n(reader, writer, expected.size).await?;
        writer.commit(expected).await
    }
}

/// Stream exactly `size` bytes from `reader` into `writer`.
///
/// Ends with a verification error when the reader runs dry first.
pub async fn copy_n(mut reader: ByteStream, writer: &mut dyn BlobWriter, size: u64) -> Result<u64> {
    let mut remaining = size;

    while remaining > 0 {
        let Some(chunk) = reader.next().await else {
            return Err(RegistryError::Verification(format!(
                "Short read: expected {} bytes, stream ended after {}",
                size,
                size - remaining
            )));
        };
        let mut chunk = chunk?;
        if chunk.len() as u64 > remaining {
            chunk.truncate(remaining as usize);
        }
        remaining -= chunk.len() as u64;
        writer.write(chunk).await?;
    }

    Ok(size)
}
