//! Typed clients for the platform contracts.
//!
//! One module per deployed contract, each a thin decode layer over
//! `ChainClient`. The calldata is assembled by `chain::codec`; no ABI files
//! are involved.

pub mod battle;
pub mod factory;
pub mod sale;
pub mod warriors;

pub use battle::{Battle, BattleClient};
pub use factory::{FactoryClient, TokenOnChain};
pub use sale::{ExpectedClaim, FairLaunchData, SaleClient};
pub use warriors::WarriorClient;
