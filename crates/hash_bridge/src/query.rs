//! Answers header queries in the canonical hash namespace.
//!
//! The upstream links headers by native hash. Every header passing through
//! here has its `parentHash` swapped for the recorded canonical hash; when no
//! mapping exists (genesis, or history older than the store) the value is
//! passed through untouched.
use std::sync::Arc;

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::B256;
use thiserror::Error;
use tracing::trace;

use crate::net::ChainSource;
use crate::net::rpc::RpcError;
use crate::store::{StoreError, TranslationStore};
use crate::types::RpcHeader;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("upstream error: {0}")]
    Upstream(#[from] RpcError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::Upstream(e) if e.is_not_found())
    }
}

pub struct QueryService<C, S> {
    upstream: Arc<C>,
    store: Arc<S>,
}

impl<C, S> Clone for QueryService<C, S> {
    fn clone(&self) -> Self {
        Self {
            upstream: Arc::clone(&self.upstream),
            store: Arc::clone(&self.store),
        }
    }
}

impl<C, S> QueryService<C, S>
where
    C: ChainSource,
    S: TranslationStore,
{
    pub fn new(upstream: Arc<C>, store: Arc<S>) -> Self {
        Self { upstream, store }
    }

    /// Fetches the header of `block` with its parent hash in canonical form.
    pub async fn header_by_number(&self, block: BlockNumberOrTag) -> Result<RpcHeader, QueryError> {
        let header = self.upstream.header_by_number(block).await?;
        self.canonicalize(header)
    }

    /// Fetches a header by hash. Canonical hashes are translated to native
    /// before asking the upstream; a hash with no mapping is assumed to be
    /// native already.
    pub async fn header_by_hash(&self, hash: B256) -> Result<RpcHeader, QueryError> {
        let native = match self.store.lookup_native(&hash)? {
            Some(native) => native,
            None => {
                trace!(%hash, "no native mapping, using hash as given");
                hash
            }
        };
        let header = self.upstream.header_by_hash(native).await?;
        self.canonicalize(header)
    }

    fn canonicalize(&self, mut header: RpcHeader) -> Result<RpcHeader, QueryError> {
        if let Some(parent) = self.store.lookup_canonical(&header.parent_hash)? {
            header.parent_hash = parent;
        }
        Ok(header)
    }
}
