//! Durable bidirectional mapping between native and canonical block hashes.
//!
//! Each block contributes one translation pair, written in both directions
//! together with the sync checkpoint in a single transaction. The checkpoint
//! is the highest block number below which every pair is present.
use alloy_primitives::B256;
use thiserror::Error;

pub mod disk;

pub use disk::{DiskStore, Snapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("checkpoint value {0:?} is not a block number")]
    CorruptCheckpoint(String),
}

pub trait TranslationStore: Send + Sync {
    /// Records the pair for block `number`. The checkpoint advances to
    /// `number` only if it directly follows the current checkpoint.
    fn put(&self, number: u64, native: B256, canonical: B256) -> Result<(), StoreError>;

    /// Canonical hash recorded for `native`, if any.
    fn lookup_canonical(&self, native: &B256) -> Result<Option<B256>, StoreError>;

    /// Native hash recorded for `canonical`, if any.
    fn lookup_native(&self, canonical: &B256) -> Result<Option<B256>, StoreError>;

    /// Highest contiguously committed block, `None` before the first sync.
    fn checkpoint(&self) -> Result<Option<u64>, StoreError>;
}
