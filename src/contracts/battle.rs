//! Battle registry reads.
//!
//! `getBattles()` returns the full battle list as a dynamic array of
//! static structs; each element occupies twelve words.

use crate::chain::{codec, ChainClient};
use crate::types::BattleStatus;
use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::instrument;

const BATTLE_WORDS: usize = 12;

/// One battle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Battle {
    pub battle_id: U256,
    pub meme_a: Address,
    pub meme_b: Address,
    /// Warrior NFTs allocated to each side; non-decreasing while Started
    pub a_allocated: U256,
    pub b_allocated: U256,
    pub heat_a: U256,
    pub heat_b: U256,
    pub start_time: u64,
    pub end_time: u64,
    pub status: BattleStatus,
    winner_raw: Address,
    pub total_reward: U256,
}

impl Battle {
    /// The winning token. Only meaningful once the battle resolved; every
    /// other state yields `None` regardless of what the raw field holds.
    pub fn winner(&self) -> Option<Address> {
        if self.status == BattleStatus::Resolved {
            Some(self.winner_raw)
        } else {
            None
        }
    }

    /// Whether `token` fights on either side.
    pub fn involves(&self, token: Address) -> bool {
        self.meme_a == token || self.meme_b == token
    }

    /// Decode one battle from twelve consecutive words.
    fn from_words(words: &[codec::Word], at: usize) -> Result<Self> {
        Ok(Battle {
            battle_id: codec::u256_at(words, at)?,
            meme_a: codec::address_at(words, at + 1)?,
            meme_b: codec::address_at(words, at + 2)?,
            a_allocated: codec::u256_at(words, at + 3)?,
            b_allocated: codec::u256_at(words, at + 4)?,
            heat_a: codec::u256_at(words, at + 5)?,
            heat_b: codec::u256_at(words, at + 6)?,
            start_time: codec::u64_at(words, at + 7)?,
            end_time: codec::u64_at(words, at + 8)?,
            status: BattleStatus::from_raw(codec::u8_at(words, at + 9)?),
            winner_raw: codec::address_at(words, at + 10)?,
            total_reward: codec::u256_at(words, at + 11)?,
        })
    }

    /// Encode a battle back into words; used by tests to build fixtures.
    #[cfg(any(test, feature = "test-fixtures"))]
    pub fn to_words(&self) -> Vec<codec::Word> {
        let status_raw = match self.status {
            BattleStatus::Pending => 0u64,
            BattleStatus::Approved => 1,
            BattleStatus::Started => 2,
            BattleStatus::Resolved => 3,
            BattleStatus::Draw => 4,
        };
        vec![
            codec::word_from_u256(self.battle_id),
            codec::word_from_address(self.meme_a),
            codec::word_from_address(self.meme_b),
            codec::word_from_u256(self.a_allocated),
            codec::word_from_u256(self.b_allocated),
            codec::word_from_u256(self.heat_a),
            codec::word_from_u256(self.heat_b),
            codec::word_from_u64(self.start_time),
            codec::word_from_u64(self.end_time),
            codec::word_from_u64(status_raw),
            codec::word_from_address(self.winner_raw),
            codec::word_from_u256(self.total_reward),
        ]
    }

    /// Build a battle fixture with an explicit raw winner field.
    #[cfg(any(test, feature = "test-fixtures"))]
    pub fn fixture(
        battle_id: u64,
        meme_a: Address,
        meme_b: Address,
        status: BattleStatus,
        winner_raw: Address,
        start_time: u64,
        end_time: u64,
    ) -> Self {
        Battle {
            battle_id: U256::from(battle_id),
            meme_a,
            meme_b,
            a_allocated: U256::ZERO,
            b_allocated: U256::ZERO,
            heat_a: U256::ZERO,
            heat_b: U256::ZERO,
            start_time,
            end_time,
            status,
            winner_raw,
            total_reward: U256::ZERO,
        }
    }
}

/// Decode the return data of `getBattles()`.
pub fn decode_battles(raw: &[u8]) -> Result<Vec<Battle>> {
    let words = codec::words(raw)?;
    let (length, first) = codec::dynamic_array_head(&words)?;

    let needed = first + length * BATTLE_WORDS;
    if words.len() < needed {
        return Err(anyhow!(
            "battle array claims {} elements but data holds {} words",
            length,
            words.len()
        ));
    }

    (0..length)
        .map(|i| Battle::from_words(&words, first + i * BATTLE_WORDS))
        .collect()
}

pub struct BattleClient {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl BattleClient {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    /// Fetch every battle the registry knows about.
    #[instrument(skip(self))]
    pub async fn battles(&self) -> Result<Vec<Battle>> {
        let data = codec::encode_call("getBattles()", &[]);
        let raw = self
            .chain
            .call(self.address, data)
            .await
            .context("getBattles failed")?;
        decode_battles(&raw)
    }
}
