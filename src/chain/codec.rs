//! Minimal ABI codec for the handful of call shapes the platform uses:
//! static-tuple arguments, word-aligned return data, and one dynamic array
//! of static structs (the battle list).

use alloy_primitives::{keccak256, Address, B256, U256};
use anyhow::{anyhow, Result};

/// 32-byte ABI word.
pub type Word = [u8; 32];

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Full keccak hash of an event signature, used as topic0.
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// An address left-padded into a 32-byte topic, for indexed-argument
/// filters.
pub fn address_topic(address: Address) -> B256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    B256::from(word)
}

pub fn word_from_u256(value: U256) -> Word {
    value.to_be_bytes::<32>()
}

pub fn word_from_u64(value: u64) -> Word {
    word_from_u256(U256::from(value))
}

pub fn word_from_address(address: Address) -> Word {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// Encode a call to `signature` with static-word arguments.
pub fn encode_call(signature: &str, args: &[Word]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 * args.len());
    data.extend_from_slice(&selector(signature));
    for word in args {
        data.extend_from_slice(word);
    }
    data
}

/// Split return data into exact 32-byte words.
pub fn words(data: &[u8]) -> Result<Vec<Word>> {
    if data.len() % 32 != 0 {
        return Err(anyhow!(
            "return data length {} is not word-aligned",
            data.len()
        ));
    }
    Ok(data
        .chunks_exact(32)
        .map(|chunk| {
            let mut word = [0u8; 32];
            word.copy_from_slice(chunk);
            word
        })
        .collect())
}

fn word_at(words: &[Word], index: usize) -> Result<&Word> {
    words
        .get(index)
        .ok_or_else(|| anyhow!("return data has no word {}", index))
}

pub fn u256_at(words: &[Word], index: usize) -> Result<U256> {
    Ok(U256::from_be_bytes(*word_at(words, index)?))
}

pub fn u64_at(words: &[Word], index: usize) -> Result<u64> {
    let value = u256_at(words, index)?;
    u64::try_from(value).map_err(|_| anyhow!("word {} does not fit in u64", index))
}

pub fn u8_at(words: &[Word], index: usize) -> Result<u8> {
    let value = u256_at(words, index)?;
    u8::try_from(value).map_err(|_| anyhow!("word {} does not fit in u8", index))
}

pub fn address_at(words: &[Word], index: usize) -> Result<Address> {
    let word = word_at(words, index)?;
    Ok(Address::from_slice(&word[12..]))
}

pub fn bool_at(words: &[Word], index: usize) -> Result<bool> {
    let value = u256_at(words, index)?;
    Ok(!value.is_zero())
}

/// Decode `uint256[]`-style head of a dynamic array of static structs:
/// returns (element count, index of the first element word).
///
/// Layout: word 0 holds the byte offset of the array (normally 0x20), the
/// word at that offset holds the length, elements follow inline.
pub fn dynamic_array_head(words: &[Word]) -> Result<(usize, usize)> {
    let offset = u64_at(words, 0)? as usize;
    if offset % 32 != 0 {
        return Err(anyhow!("array offset {} is not word-aligned", offset));
    }
    let length_index = offset / 32;
    let length = u64_at(words, length_index)? as usize;
    Ok((length, length_index + 1))
}
