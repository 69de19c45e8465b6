//! memed-pulse - chain-data backbone for the Memed token battle platform
//!
//! This crate mirrors platform state for display: batched per-token
//! contract reads, event-log replay feeds with block-time joins, an
//! ETH/USD price feed with off-chain fallback, a backend REST client, and
//! an epoch-guarded polling engine publishing wholesale snapshots.

pub mod aggregator;
pub mod api;
pub mod battles;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod history;
pub mod oracle;
pub mod poller;
pub mod pricing;
pub mod tx;
pub mod types;

// Re-export the main entry points for convenience
pub use aggregator::{BatchAggregator, TokenContractData, TokensBatchData};
pub use chain::{ChainClient, RpcChainClient};
pub use config::PulseConfig;
pub use oracle::{EthUsdFeed, EthUsdPrice};
pub use poller::{spawn_poller, PollerHandle, Snapshot};
pub use types::{BattleStatus, FairLaunchStatus, LaunchId, PricePoint, SortOrder};
