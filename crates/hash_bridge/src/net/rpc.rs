use std::fmt;
use std::time::Duration;

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{B256, U64};
use reqwest::{self, Client, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{self, Value, json};

use super::ChainSource;
use crate::types::{BlockHashPair, RpcHeader};

/// Errors that can occur when talking to the upstream JSON-RPC endpoint.
#[derive(Debug)]
pub enum RpcError {
    NonHttpUrl,
    /// The node answered with a `null` result: the block does not exist (yet).
    NotFound,
    Client(String),
    Json(serde_json::Error),
    Status(StatusCode),
    Rpc { code: i64, message: String },
}

impl RpcError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RpcError::NotFound)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::NonHttpUrl => write!(f, "only http:// and https:// URLs are supported"),
            RpcError::NotFound => write!(f, "not found"),
            RpcError::Client(e) => write!(f, "client error: {e}"),
            RpcError::Json(e) => write!(f, "JSON error: {e}"),
            RpcError::Status(status) => write!(f, "unexpected HTTP status: {status}"),
            RpcError::Rpc { code, message } => {
                write!(f, "RPC error {code}: {message}")
            }
        }
    }
}

impl std::error::Error for RpcError {}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Json(e)
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(borrow)]
    params: &'a [Value],
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// Minimal JSON-RPC client for the upstream execution-layer node.
///
/// Every request is bounded by the timeout given at construction; a timeout
/// surfaces as [`RpcError::Client`] like any other transport failure.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: Client,
    url: Url,
}

impl RpcClient {
    /// Creates a new client for the given endpoint, e.g. `http://ethermint0:8545`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let url = Url::parse(url).map_err(|e| RpcError::Client(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            _ => {
                return Err(RpcError::NonHttpUrl);
            }
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Client(e.to_string()))?;

        Ok(RpcClient { client, url })
    }

    async fn call<T>(&self, method: &str, params: &[Value]) -> Result<T, RpcError>
    where
        T: DeserializeOwned,
    {
        let request_body = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let req = self
            .client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, "application/json");

        let res = req
            .json(&request_body)
            .send()
            .await
            .map_err(|e| RpcError::Client(e.to_string()))?;

        if !res.status().is_success() {
            return Err(RpcError::Status(res.status()));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| RpcError::Client(e.to_string()))?;
        let rpc_response: JsonRpcResponse<T> = serde_json::from_slice(&bytes)?;

        if let Some(err) = rpc_response.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        rpc_response.result.ok_or(RpcError::NotFound)
    }

    /// Returns the number of the most recent block (`eth_blockNumber`).
    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let number: U64 = self.call("eth_blockNumber", &[]).await?;
        Ok(number.to::<u64>())
    }

    /// Returns the native/canonical hash pair of a block (`eth_getBlockByNumber`).
    pub async fn get_block_hashes(
        &self,
        block: BlockNumberOrTag,
    ) -> Result<BlockHashPair, RpcError> {
        self.call("eth_getBlockByNumber", &[json!(block), json!(false)]).await
    }

    /// Returns the raw header of a block by number or tag.
    pub async fn get_header_by_number(
        &self,
        block: BlockNumberOrTag,
    ) -> Result<RpcHeader, RpcError> {
        self.call("eth_getBlockByNumber", &[json!(block), json!(false)]).await
    }

    /// Returns the raw header of a block by its native hash (`eth_getBlockByHash`).
    pub async fn get_header_by_hash(&self, hash: B256) -> Result<RpcHeader, RpcError> {
        self.call("eth_getBlockByHash", &[json!(hash), json!(false)]).await
    }
}

impl ChainSource for RpcClient {
    async fn current_height(&self) -> Result<u64, RpcError> {
        self.block_number().await
    }

    async fn block_hash_pair(&self, block: BlockNumberOrTag) -> Result<BlockHashPair, RpcError> {
        self.get_block_hashes(block).await
    }

    async fn header_by_number(&self, block: BlockNumberOrTag) -> Result<RpcHeader, RpcError> {
        self.get_header_by_number(block).await
    }

    async fn header_by_hash(&self, hash: B256) -> Result<RpcHeader, RpcError> {
        self.get_header_by_hash(hash).await
    }
}
