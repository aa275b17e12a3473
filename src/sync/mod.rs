//! Tag and blob synchronization between two repositories

pub mod blob;
pub mod orchestrator;

pub use blob::{BlobSyncOutcome, BlobSynchronizer};
pub use orchestrator::{SyncReport, Syncer};
