//! Keeps the translation store in step with the upstream chain.
//!
//! Startup resumes from the store checkpoint and walks every block up to the
//! head reported at that moment. After that the synchronizer polls for one
//! new block per tick. Both phases commit through the same path.
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use alloy_eips::BlockNumberOrTag;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::net::ChainSource;
use crate::net::rpc::RpcError;
use crate::store::{StoreError, TranslationStore};
use crate::types::BlockHashPair;

/// Errors that stop the synchronizer.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read chain head: {0}")]
    Head(#[source] RpcError),
    #[error("failed to fetch block {height}: {source}")]
    Fetch {
        height: u64,
        #[source]
        source: RpcError,
    },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    Uninitialized,
    CatchingUp,
    Steady,
}

impl SyncPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SyncPhase::CatchingUp,
            2 => SyncPhase::Steady,
            _ => SyncPhase::Uninitialized,
        }
    }
}

/// Progress shared between the synchronizer and its observers.
///
/// Only the synchronizer writes; anyone holding the `Arc` may read.
#[derive(Debug, Default)]
pub struct SyncState {
    /// Last synced height plus one, zero while nothing is synced.
    synced: AtomicU64,
    phase: AtomicU8,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest block whose pair is committed.
    pub fn height(&self) -> Option<u64> {
        self.synced.load(Ordering::Acquire).checked_sub(1)
    }

    pub fn phase(&self) -> SyncPhase {
        SyncPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn next_height(&self) -> u64 {
        self.synced.load(Ordering::Acquire)
    }

    fn set_height(&self, height: u64) {
        self.synced.store(height.saturating_add(1), Ordering::Release);
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time between steady-state polls.
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(4),
        }
    }
}

/// Result of one steady-state poll.
#[derive(Debug)]
pub enum Tick {
    /// The pair for this block was committed.
    Committed(u64),
    /// The next block has not been produced yet.
    Pending,
    /// The upstream could not be reached; nothing changed.
    Failed(RpcError),
}

pub struct Synchronizer<C, S> {
    upstream: Arc<C>,
    store: Arc<S>,
    state: Arc<SyncState>,
    config: SyncConfig,
}

impl<C, S> Synchronizer<C, S>
where
    C: ChainSource,
    S: TranslationStore,
{
    pub fn new(upstream: Arc<C>, store: Arc<S>, state: Arc<SyncState>, config: SyncConfig) -> Self {
        Self {
            upstream,
            store,
            state,
            config,
        }
    }

    pub fn state(&self) -> &Arc<SyncState> {
        &self.state
    }

    /// Loads the checkpoint into the shared state and returns the first
    /// block that still needs a pair.
    pub fn resume(&self) -> Result<u64, SyncError> {
        match self.store.checkpoint()? {
            Some(height) => {
                self.state.set_height(height);
                Ok(height + 1)
            }
            None => Ok(0),
        }
    }

    /// Commits every block in `[start, head)`, `head` being the upstream
    /// height at the time of the call. Any fetch failure aborts the walk.
    ///
    /// Returns the next block number to poll for.
    pub async fn catch_up(&self, start: u64) -> Result<u64, SyncError> {
        self.state.set_phase(SyncPhase::CatchingUp);
        let head = self
            .upstream
            .current_height()
            .await
            .map_err(SyncError::Head)?;
        info!(start, head, "walking chain");

        for height in start..head {
            let pair = self
                .upstream
                .block_hash_pair(BlockNumberOrTag::Number(height))
                .await
                .map_err(|source| SyncError::Fetch { height, source })?;
            self.record(height, pair)?;
        }

        self.state.set_phase(SyncPhase::Steady);
        Ok(head.max(start))
    }

    /// Tries to commit the block right after the last synced one.
    ///
    /// Only store failures are returned as errors.
    pub async fn tick(&self) -> Result<Tick, StoreError> {
        let height = self.state.next_height();
        match self
            .upstream
            .block_hash_pair(BlockNumberOrTag::Number(height))
            .await
        {
            Ok(pair) => {
                self.record(height, pair)?;
                Ok(Tick::Committed(height))
            }
            Err(e) if e.is_not_found() => Ok(Tick::Pending),
            Err(e) => Ok(Tick::Failed(e)),
        }
    }

    /// Resumes, catches up, then polls until `shutdown` fires.
    ///
    /// Cancellation only happens while awaiting the upstream or the timer,
    /// never inside a store commit.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), SyncError> {
        let start = self.resume()?;

        let next = tokio::select! {
            res = self.catch_up(start) => res?,
            _ = shutdown.changed() => {
                info!("shutdown requested during catch-up");
                return Ok(());
            }
        };
        info!(next, "caught up, polling for new blocks");

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await? {
                        Tick::Committed(_) => {}
                        Tick::Pending => {
                            debug!(next = self.state.next_height(), "block not produced yet");
                        }
                        Tick::Failed(e) => {
                            warn!(
                                next = self.state.next_height(),
                                "upstream error, retrying next tick: {e}"
                            );
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!(height = ?self.state.height(), "synchronizer stopping");
                    return Ok(());
                }
            }
        }
    }

    fn record(&self, height: u64, pair: BlockHashPair) -> Result<(), StoreError> {
        self.store.put(height, pair.native_hash, pair.canonical_hash)?;
        self.state.set_height(height);
        info!(
            height,
            native = %pair.native_hash,
            canonical = %pair.canonical_hash,
            "synced block"
        );
        Ok(())
    }
}
