//! Sync orchestrator
//!
//! Drives a run: for each tag, in order, fetch the source manifest and sync every
//! blob it references into the destination. Everything is awaited in sequence and
//! the first error ends the run.

use crate::config::SyncOptions;
use crate::error::Result;
use crate::logging::Logger;
use crate::manifest::ACCEPTED_MANIFEST_TYPES;
use crate::registry::reference::{validate_tag, Reference};
use crate::registry::repository::Repository;
use crate::sync::blob::{BlobSyncOutcome, BlobSynchronizer};
use std::time::{Duration, Instant};

/// Totals for a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Tags synced, in processing order
    pub tags: Vec<String>,
    pub blobs_copied: usize,
    pub blobs_skipped: usize,
    pub bytes_transferred: u64,
    pub elapsed: Duration,
}

impl SyncReport {
    fn record(&mut self, outcome: &BlobSyncOutcome) {
        match outcome {
            BlobSyncOutcome::Copied(descriptor) => {
                self.blobs_copied += 1;
                self.bytes_transferred += descriptor.size;
            }
            BlobSyncOutcome::Skipped(_) => self.blobs_skipped += 1,
        }
    }
}

pub struct Syncer {
    blobs: BlobSynchronizer,
    output: Logger,
}

impl Syncer {
    pub fn new(options: SyncOptions, output: Logger) -> Self {
        Self {
            blobs: BlobSynchronizer::new(options, output.clone()),
            output,
        }
    }

    /// Tags to sync: the given ones when any were given, then the tag the source
    /// handle is bound to, otherwise every tag the source lists.
    pub async fn resolve_tags(&self, source: &Repository, tags: &[String]) -> Result<Vec<String>> {
        if !tags.is_empty() {
            for tag in tags {
                validate_tag(tag)?;
            }
            return Ok(tags.to_vec());
        }

        if let Some(tag) = source.tag() {
            return Ok(vec![tag.to_string()]);
        }

        self.output
            .verbose(&format!("No tags given, listing tags of {}", source.name()));
        let all = source.tags().all().await?;
        if all.is_empty() {
            self.output.warning(&format!("Repository {} has no tags", source.name()));
        }
        Ok(all)
    }

    pub async fn sync(&self, source: &Repository, destination: &Repository, tags: &[String]) -> Result<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::default();

        self.output.section(&format!(
            "Syncing {} -> {} ({} tags)",
            source.name(),
            destination.name(),
            tags.len()
        ));

        for (index, tag) in tags.iter().enumerate() {
            self.output
                .info(&format!("[{}/{}] {}:{}", index + 1, tags.len(), source.name(), tag));
            self.sync_tag(source, destination, tag, &mut report).await?;
            report.tags.push(tag.clone());
        }

        report.elapsed = started.elapsed();
        self.output.success(&format!(
            "Synced {} tags: {} blobs copied ({}), {} skipped in {}",
            report.tags.len(),
            report.blobs_copied,
            self.output.format_size(report.bytes_transferred),
            report.blobs_skipped,
            self.output.format_duration(report.elapsed)
        ));
        Ok(report)
    }

    async fn sync_tag(
        &self,
        source: &Repository,
        destination: &Repository,
        tag: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        let reference = Reference::tag(tag)?;
        let manifest = source.manifests().get(&reference, ACCEPTED_MANIFEST_TYPES).await?;
        let references = manifest.references();

        self.output.verbose(&format!(
            "Manifest {} for {} lists {} blobs",
            manifest.media_type(),
            tag,
            references.len()
        ));

        for descriptor in references {
            let outcome = self
                .blobs
                .sync_blob(source.blobs(), destination.blobs(), descriptor)
                .await?;
            report.record(&outcome);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Descriptor;
    use crate::registry::transport::testing::{respond, FnTransport};

    #[test]
    fn test_report_counts_outcomes() {
        let mut report = SyncReport::default();
        report.record(&BlobSyncOutcome::Copied(Descriptor::new("sha256:a", 10, "layer")));
        report.record(&BlobSyncOutcome::Copied(Descriptor::new("sha256:b", 20, "layer")));
        report.record(&BlobSyncOutcome::Skipped(Descriptor::new("sha256:c", 5, "layer")));

        assert_eq!(report.blobs_copied, 2);
        assert_eq!(report.blobs_skipped, 1);
        assert_eq!(report.bytes_transferred, 30);
    }

    #[tokio::test]
    async fn test_bound_tag_used_when_none_given() {
        let transport = FnTransport::new(|_| respond(500, &[], b""));
        let source = Repository::new(
            "library/alpine",
            Some("3.10.2"),
            "https://registry.example",
            transport.clone(),
            Logger::new_quiet(),
        )
        .unwrap();
        let syncer = Syncer::new(SyncOptions::default(), Logger::new_quiet());

        assert_eq!(syncer.resolve_tags(&source, &[]).await.unwrap(), vec!["3.10.2"]);
        assert_eq!(
            syncer.resolve_tags(&source, &["latest".to_string()]).await.unwrap(),
            vec!["latest"]
        );
        assert!(transport.recorded().is_empty());
    }
}
