//! JSON-RPC front door serving canonical-namespace block queries.

use std::net::SocketAddr;
use std::sync::Arc;

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::B256;
use async_trait::async_trait;
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use jsonrpsee::types::ErrorObject;
use serde::Serialize;
use tracing::{debug, info};

use crate::net::ChainSource;
use crate::query::{QueryError, QueryService};
use crate::store::TranslationStore;
use crate::sync::{SyncPhase, SyncState};
use crate::types::RpcHeader;

/// Error code for failures while serving a request.
pub const SERVER_ERROR_CODE: i32 = -32000;

/// Canonical-chain block queries. Only headers are returned; the
/// `full_transactions` flag is accepted for compatibility.
#[rpc(server, namespace = "eth")]
pub trait EthApi {
    #[method(name = "getBlockByNumber")]
    async fn get_block_by_number(
        &self,
        block: BlockNumberOrTag,
        full_transactions: bool,
    ) -> RpcResult<Option<RpcHeader>>;

    #[method(name = "getBlockByHash")]
    async fn get_block_by_hash(
        &self,
        hash: B256,
        full_transactions: bool,
    ) -> RpcResult<Option<RpcHeader>>;
}

#[rpc(server, namespace = "bridge")]
pub trait BridgeApi {
    /// Reports how far the translation store has been synced.
    #[method(name = "syncStatus")]
    async fn sync_status(&self) -> RpcResult<SyncStatus>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub height: Option<u64>,
}

pub struct BridgeRpc<C, S> {
    query: QueryService<C, S>,
    state: Arc<SyncState>,
}

impl<C, S> Clone for BridgeRpc<C, S> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<C, S> BridgeRpc<C, S>
where
    C: ChainSource + 'static,
    S: TranslationStore + 'static,
{
    pub fn new(query: QueryService<C, S>, state: Arc<SyncState>) -> Self {
        Self { query, state }
    }

    /// All methods served by the bridge, merged into one module.
    pub fn into_module(self) -> Result<RpcModule<()>, jsonrpsee::core::RegisterMethodError> {
        let mut module = RpcModule::new(());
        module.merge(EthApiServer::into_rpc(self.clone()))?;
        module.merge(BridgeApiServer::into_rpc(self))?;
        Ok(module)
    }
}

/// A header the upstream does not have is a `null` result, not an error.
fn header_response(res: Result<RpcHeader, QueryError>) -> RpcResult<Option<RpcHeader>> {
    match res {
        Ok(header) => Ok(Some(header)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => {
            debug!("request failed: {e}");
            Err(ErrorObject::owned(SERVER_ERROR_CODE, e.to_string(), None::<()>))
        }
    }
}

#[async_trait]
impl<C, S> EthApiServer for BridgeRpc<C, S>
where
    C: ChainSource + 'static,
    S: TranslationStore + 'static,
{
    async fn get_block_by_number(
        &self,
        block: BlockNumberOrTag,
        _full_transactions: bool,
    ) -> RpcResult<Option<RpcHeader>> {
        header_response(self.query.header_by_number(block).await)
    }

    async fn get_block_by_hash(
        &self,
        hash: B256,
        _full_transactions: bool,
    ) -> RpcResult<Option<RpcHeader>> {
        header_response(self.query.header_by_hash(hash).await)
    }
}

#[async_trait]
impl<C, S> BridgeApiServer for BridgeRpc<C, S>
where
    C: ChainSource + 'static,
    S: TranslationStore + 'static,
{
    async fn sync_status(&self) -> RpcResult<SyncStatus> {
        Ok(SyncStatus {
            phase: self.state.phase(),
            height: self.state.height(),
        })
    }
}

/// Binds `addr` and starts serving. The server runs until the returned
/// handle is stopped.
pub async fn start_server<C, S>(
    addr: SocketAddr,
    rpc: BridgeRpc<C, S>,
) -> Result<(SocketAddr, ServerHandle), Box<dyn std::error::Error + Send + Sync>>
where
    C: ChainSource + 'static,
    S: TranslationStore + 'static,
{
    let server = Server::builder().build(addr).await?;
    let local_addr = server.local_addr()?;
    let handle = server.start(rpc.into_module()?);
    info!(%local_addr, "RPC server listening");
    Ok((local_addr, handle))
}
