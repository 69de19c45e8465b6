//! Chain read adapter: the seam between typed contract clients and the
//! underlying EVM JSON-RPC transport.
//!
//! Everything above this module speaks in decoded tuples; everything below
//! speaks hex-encoded JSON-RPC. Tests substitute the trait with an
//! in-memory chain.

pub mod codec;
pub mod health;
pub mod rpc;

use alloy_primitives::{Address, B256};
use anyhow::Result;
use async_trait::async_trait;

pub use rpc::RpcChainClient;

/// Filter for an `eth_getLogs` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contract
    pub address: Address,
    /// Event signature topic
    pub topic0: B256,
    /// Optional first indexed argument (e.g. a user address)
    pub topic1: Option<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

/// A raw event log as returned by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    /// Non-indexed event arguments, ABI-encoded
    pub data: Vec<u8>,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
}

/// Minimal transaction receipt: enough to settle a tracked write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    /// True when the transaction executed successfully
    pub success: bool,
    pub block_number: u64,
}

/// Read access to the chain.
///
/// All methods are fire-and-await: they suspend the calling task only,
/// never a thread.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Execute an `eth_call` against `to` and return the raw return data.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>>;

    /// Latest block number.
    async fn block_number(&self) -> Result<u64>;

    /// Logs matching `filter`, in node order.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>>;

    /// Timestamp of the block at `number`, unix seconds.
    async fn block_timestamp(&self, number: u64) -> Result<u64>;

    /// Receipt for `hash`, or `None` while the transaction is pending.
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>>;
}
