//! Translation bridge between a consensus layer's native block hashes and the
//! canonical hashes its execution layer serves.
//!
//! - `store`: durable two-way hash mapping plus sync checkpoint (redb)
//! - `sync`: catch-up walk and steady-state polling that fill the store
//! - `query`: header lookups rewritten into the canonical namespace
//! - `server`: `eth_getBlockByNumber` / `eth_getBlockByHash` over JSON-RPC
pub mod net;
pub mod query;
pub mod server;
pub mod store;
pub mod sync;
pub mod types;

#[cfg(test)]
mod mocks;
