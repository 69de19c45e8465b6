//! Token factory reads: per-token metadata tuples and heat scores.

use crate::chain::{codec, ChainClient};
use crate::types::LaunchId;
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::instrument;

/// The factory's per-token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenOnChain {
    /// ERC-20 address of the meme token
    pub token: Address,
    /// Paired warrior NFT contract
    pub warrior_nft: Address,
    pub creator: Address,
    /// Whether the creator has claimed the token post-launch
    pub is_claimed_by_creator: bool,
    /// Creation timestamp, unix seconds
    pub created_at: u64,
}

pub struct FactoryClient {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl FactoryClient {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    /// Fetch the token record for a launch id.
    #[instrument(skip(self))]
    pub async fn token_data(&self, id: LaunchId) -> Result<TokenOnChain> {
        let data = codec::encode_call("tokenData(uint256)", &[codec::word_from_u64(id)]);
        let raw = self
            .chain
            .call(self.address, data)
            .await
            .with_context(|| format!("tokenData({}) failed", id))?;
        let words = codec::words(&raw)?;

        Ok(TokenOnChain {
            token: codec::address_at(&words, 0)?,
            warrior_nft: codec::address_at(&words, 1)?,
            creator: codec::address_at(&words, 2)?,
            is_claimed_by_creator: codec::bool_at(&words, 3)?,
            created_at: codec::u64_at(&words, 4)?,
        })
    }

    /// Current heat score of a token.
    #[instrument(skip(self))]
    pub async fn token_heat(&self, token: Address) -> Result<U256> {
        let data = codec::encode_call("tokenHeat(address)", &[codec::word_from_address(token)]);
        let raw = self
            .chain
            .call(self.address, data)
            .await
            .with_context(|| format!("tokenHeat({}) failed", token))?;
        let words = codec::words(&raw)?;
        codec::u256_at(&words, 0)
    }
}
