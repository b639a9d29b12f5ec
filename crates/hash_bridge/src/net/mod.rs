//! Access to the upstream execution-layer node.
//!
//! [`ChainSource`] is the narrow interface the synchronizer and the query
//! service consume; [`rpc::RpcClient`] implements it over HTTP JSON-RPC.
use std::future::Future;

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::B256;

use crate::types::{BlockHashPair, RpcHeader};
use rpc::RpcError;

pub mod rpc;

pub trait ChainSource: Send + Sync {
    /// Number of the most recent block the node knows about.
    fn current_height(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;

    /// Native and canonical hash of a block. Fails with [`RpcError::NotFound`]
    /// when the block has not been produced yet.
    fn block_hash_pair(
        &self,
        block: BlockNumberOrTag,
    ) -> impl Future<Output = Result<BlockHashPair, RpcError>> + Send;

    fn header_by_number(
        &self,
        block: BlockNumberOrTag,
    ) -> impl Future<Output = Result<RpcHeader, RpcError>> + Send;

    /// Looks a header up by its native hash.
    fn header_by_hash(&self, hash: B256)
    -> impl Future<Output = Result<RpcHeader, RpcError>> + Send;
}
