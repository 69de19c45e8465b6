//! Core types shared across the memed-pulse data layer.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Identifier of a fair launch on the token sale contract.
pub type LaunchId = u64;

/// Lifecycle of a fair launch as reported by the sale contract.
///
/// `Completed` and `Failed` are terminal; `Active` transitions to exactly
/// one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FairLaunchStatus {
    NotStarted,
    Active,
    Completed,
    Failed,
}

impl FairLaunchStatus {
    /// Decode the raw status discriminant from the fair-launch tuple.
    /// Unknown values decode to `NotStarted`, matching the platform
    /// front-end's default when the field is absent.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => FairLaunchStatus::Active,
            2 => FairLaunchStatus::Completed,
            3 => FairLaunchStatus::Failed,
            _ => FairLaunchStatus::NotStarted,
        }
    }

    /// Whether the launch can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FairLaunchStatus::Completed | FairLaunchStatus::Failed)
    }
}

impl Default for FairLaunchStatus {
    fn default() -> Self {
        FairLaunchStatus::NotStarted
    }
}

/// Status of a battle between two tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleStatus {
    Pending,
    Approved,
    Started,
    Resolved,
    Draw,
}

impl BattleStatus {
    /// Decode the raw status discriminant from the battle struct.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => BattleStatus::Approved,
            2 => BattleStatus::Started,
            3 => BattleStatus::Resolved,
            4 => BattleStatus::Draw,
            _ => BattleStatus::Pending,
        }
    }

    /// Whether the battle has settled to a final outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BattleStatus::Resolved | BattleStatus::Draw)
    }
}

/// A (price, timestamp) pair derived from a mint event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Mint price in wei
    pub price: U256,
    /// Block timestamp of the mint, unix seconds
    pub timestamp: u64,
}

/// Requested ordering for a replayed event series.
///
/// Chart series want oldest-first; activity feeds want newest-first. The
/// direction is always an explicit call-site choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// An unsigned transaction request against a platform contract.
///
/// Signing and submission happen outside this crate (wallet territory);
/// this is the payload handed to a `TxSubmitter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Vec<u8>,
    /// Native value attached to the call, zero for non-payable functions
    pub value: U256,
}

impl TxRequest {
    pub fn new(to: Address, data: Vec<u8>) -> Self {
        Self { to, data, value: U256::ZERO }
    }

    pub fn with_value(to: Address, data: Vec<u8>, value: U256) -> Self {
        Self { to, data, value }
    }
}
