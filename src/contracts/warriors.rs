//! Warrior NFT reads: dynamic mint pricing driven by token heat, plus the
//! mint-event topic used for price-history replay.

use crate::chain::{codec, ChainClient};
use crate::types::TxRequest;
use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::instrument;

/// Signature of the event emitted on every warrior mint. The price is the
/// only non-indexed argument.
pub const WARRIOR_MINTED_EVENT: &str = "WarriorMinted(uint256,address,uint256)";

/// Topic0 for `WarriorMinted`.
pub fn warrior_minted_topic() -> B256 {
    codec::event_topic(WARRIOR_MINTED_EVENT)
}

pub struct WarriorClient {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl WarriorClient {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn read(&self, data: Vec<u8>, what: &str) -> Result<Vec<codec::Word>> {
        let raw = self
            .chain
            .call(self.address, data)
            .await
            .with_context(|| format!("{} failed", what))?;
        codec::words(&raw)
    }

    /// Current mint price in token units; grows with community heat.
    #[instrument(skip(self))]
    pub async fn current_price(&self) -> Result<U256> {
        let data = codec::encode_call("getCurrentPrice()", &[]);
        let words = self.read(data, "getCurrentPrice").await?;
        codec::u256_at(&words, 0)
    }

    /// The heat-independent floor price.
    #[instrument(skip(self))]
    pub async fn base_price(&self) -> Result<U256> {
        let data = codec::encode_call("BASE_PRICE()", &[]);
        let words = self.read(data, "BASE_PRICE").await?;
        codec::u256_at(&words, 0)
    }

    /// Number of warriors a user holds.
    #[instrument(skip(self))]
    pub async fn balance_of(&self, user: Address) -> Result<U256> {
        let data = codec::encode_call("balanceOf(address)", &[codec::word_from_address(user)]);
        let words = self.read(data, "balanceOf").await?;
        codec::u256_at(&words, 0)
    }

    /// Whether the user holds a warrior usable in battle.
    #[instrument(skip(self))]
    pub async fn has_active_warrior(&self, user: Address) -> Result<bool> {
        let data = codec::encode_call(
            "hasActiveWarrior(address)",
            &[codec::word_from_address(user)],
        );
        let words = self.read(data, "hasActiveWarrior").await?;
        codec::bool_at(&words, 0)
    }

    /// Token ids of the user's active warriors.
    #[instrument(skip(self))]
    pub async fn user_active_nfts(&self, user: Address) -> Result<Vec<U256>> {
        let data = codec::encode_call(
            "getUserActiveNFTs(address)",
            &[codec::word_from_address(user)],
        );
        let words = self.read(data, "getUserActiveNFTs").await?;
        let (length, first) = codec::dynamic_array_head(&words)?;
        (0..length).map(|i| codec::u256_at(&words, first + i)).collect()
    }

    /// Calldata for minting a warrior at the current price.
    pub fn mint_request(&self) -> TxRequest {
        TxRequest::new(self.address, codec::encode_call("mintWarrior()", &[]))
    }
}
