//! Wire types shared by the upstream client, the query service and the RPC server.
use std::collections::BTreeMap;

use alloy_primitives::{Address, B64, B256, Bloom, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The two identifiers of one block, as reported by the upstream node.
///
/// The upstream `eth_getBlockByNumber` response carries the execution layer's
/// hash in `hash` and the consensus layer's hash in `tm_hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHashPair {
    #[serde(rename = "hash")]
    pub canonical_hash: B256,
    #[serde(rename = "tm_hash")]
    pub native_hash: B256,
}

/// Block header in the JSON shape canonical-chain clients expect.
///
/// Fields the bridge does not model are kept in `other` and written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcHeader {
    pub parent_hash: B256,
    pub sha3_uncles: B256,
    #[serde(default)]
    pub miner: Address,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    #[serde(with = "alloy_serde::quantity")]
    pub number: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    pub extra_data: Bytes,
    #[serde(default)]
    pub mix_hash: B256,
    #[serde(default)]
    pub nonce: B64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
    pub hash: B256,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}
