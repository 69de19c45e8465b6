//! Event-history replay.
//!
//! On-chain logs carry no wall-clock time, so every feed here joins its
//! logs against block timestamps before sorting. Feeds are best-effort
//! snapshots bounded by a look-back window; each replay fully replaces the
//! previous one.

use crate::chain::{codec, ChainClient, LogEntry, LogFilter};
use crate::contracts::warriors;
use crate::types::{PricePoint, SortOrder};
use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// A log joined with the timestamp of its containing block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedEvent {
    pub log: LogEntry,
    pub timestamp: u64,
}

/// Replay logs for one event over the trailing `max_blocks_back` blocks.
///
/// Timestamp lookups run concurrently, one per distinct block, and are
/// joined back to their logs by block number, never by arrival order.
/// The final sort by (timestamp, block, log index) in the requested
/// direction is the only ordering guarantee consumers get.
#[instrument(skip(chain))]
pub async fn replay_events(
    chain: &Arc<dyn ChainClient>,
    address: Address,
    topic0: B256,
    topic1: Option<B256>,
    max_blocks_back: u64,
    order: SortOrder,
) -> Result<Vec<ReplayedEvent>> {
    let latest = chain.block_number().await.context("resolving latest block")?;
    let from_block = latest.saturating_sub(max_blocks_back);

    let filter = LogFilter { address, topic0, topic1, from_block, to_block: latest };
    let logs = chain.get_logs(&filter).await.context("querying logs")?;
    debug!(
        "replaying {} logs from blocks {}..={}",
        logs.len(),
        from_block,
        latest
    );

    let timestamps = resolve_timestamps(chain, &logs).await?;

    let mut events: Vec<ReplayedEvent> = logs
        .into_iter()
        .map(|log| {
            let timestamp = timestamps.get(&log.block_number).copied().unwrap_or(0);
            ReplayedEvent { log, timestamp }
        })
        .collect();

    sort_events(&mut events, order);
    Ok(events)
}

/// Fetch the timestamp of every distinct block the logs touch.
async fn resolve_timestamps(
    chain: &Arc<dyn ChainClient>,
    logs: &[LogEntry],
) -> Result<HashMap<u64, u64>> {
    let blocks: HashSet<u64> = logs.iter().map(|log| log.block_number).collect();
    let lookups = blocks.iter().map(|number| {
        let number = *number;
        let chain = Arc::clone(chain);
        async move {
            let timestamp = chain
                .block_timestamp(number)
                .await
                .with_context(|| format!("resolving timestamp of block {}", number))?;
            Ok::<(u64, u64), anyhow::Error>((number, timestamp))
        }
    });

    join_all(lookups).await.into_iter().collect()
}

/// Deterministic ordering: timestamp first, block and log index break
/// ties, direction flips the whole key.
pub fn sort_events(events: &mut [ReplayedEvent], order: SortOrder) {
    events.sort_by_key(|event| {
        (event.timestamp, event.log.block_number, event.log.log_index)
    });
    if order == SortOrder::Descending {
        events.reverse();
    }
}

// Typed feeds over the generic replay.

/// Signature of the engagement reward claim event; user and reward id are
/// indexed, the amount is in the data.
pub const REWARD_CLAIMED_EVENT: &str = "EngagementRewardClaimed(address,uint256,uint256)";
/// Creator incentive unlock; the amount is the only argument.
pub const INCENTIVES_UNLOCKED_EVENT: &str = "CreatorIncentivesUnlocked(uint256)";
/// Creator incentive claim; the amount is the only argument.
pub const INCENTIVES_CLAIMED_EVENT: &str = "CreatorIncentivesClaimed(uint256)";

/// A user's reward claim, joined with its block time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimActivity {
    pub user: Address,
    pub reward_id: U256,
    pub amount: U256,
    pub timestamp: u64,
    pub transaction_hash: B256,
}

/// What a creator incentive event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorActivityKind {
    Unlocked,
    Claimed,
}

/// One entry in the creator activity feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorActivity {
    pub kind: CreatorActivityKind,
    pub amount: U256,
    pub timestamp: u64,
    pub transaction_hash: B256,
}

/// Historical warrior mint prices, oldest first, ready for charting.
#[instrument(skip(chain))]
pub async fn warrior_price_history(
    chain: &Arc<dyn ChainClient>,
    nft_address: Address,
    max_blocks_back: u64,
) -> Result<Vec<PricePoint>> {
    let events = replay_events(
        chain,
        nft_address,
        warriors::warrior_minted_topic(),
        None,
        max_blocks_back,
        SortOrder::Ascending,
    )
    .await?;

    events
        .into_iter()
        .map(|event| {
            let words = codec::words(&event.log.data)?;
            Ok(PricePoint {
                price: codec::u256_at(&words, 0)?,
                timestamp: event.timestamp,
            })
        })
        .collect()
}

/// A user's recent reward claims, newest first.
#[instrument(skip(chain))]
pub async fn recent_claims(
    chain: &Arc<dyn ChainClient>,
    engage_address: Address,
    user: Address,
    max_blocks_back: u64,
) -> Result<Vec<ClaimActivity>> {
    let events = replay_events(
        chain,
        engage_address,
        codec::event_topic(REWARD_CLAIMED_EVENT),
        Some(codec::address_topic(user)),
        max_blocks_back,
        SortOrder::Descending,
    )
    .await?;

    events
        .into_iter()
        .map(|event| {
            let words = codec::words(&event.log.data)?;
            let reward_id = event
                .log
                .topics
                .get(2)
                .map(|topic| U256::from_be_bytes(topic.0))
                .unwrap_or(U256::ZERO);
            Ok(ClaimActivity {
                user,
                reward_id,
                amount: codec::u256_at(&words, 0)?,
                timestamp: event.timestamp,
                transaction_hash: event.log.transaction_hash,
            })
        })
        .collect()
}

/// Creator incentive unlocks and claims merged into one feed, newest
/// first. Both event streams are fetched concurrently.
#[instrument(skip(chain))]
pub async fn creator_activity(
    chain: &Arc<dyn ChainClient>,
    engage_address: Address,
    max_blocks_back: u64,
) -> Result<Vec<CreatorActivity>> {
    let (unlocked, claimed) = tokio::try_join!(
        replay_events(
            chain,
            engage_address,
            codec::event_topic(INCENTIVES_UNLOCKED_EVENT),
            None,
            max_blocks_back,
            SortOrder::Ascending,
        ),
        replay_events(
            chain,
            engage_address,
            codec::event_topic(INCENTIVES_CLAIMED_EVENT),
            None,
            max_blocks_back,
            SortOrder::Ascending,
        ),
    )?;

    let decode = |events: Vec<ReplayedEvent>, kind: CreatorActivityKind| {
        events.into_iter().map(move |event| {
            let words = codec::words(&event.log.data)?;
            Ok::<CreatorActivity, anyhow::Error>(CreatorActivity {
                kind,
                amount: codec::u256_at(&words, 0)?,
                timestamp: event.timestamp,
                transaction_hash: event.log.transaction_hash,
            })
        })
    };

    let mut activities = decode(unlocked, CreatorActivityKind::Unlocked)
        .chain(decode(claimed, CreatorActivityKind::Claimed))
        .collect::<Result<Vec<_>>>()?;

    // merged feed is newest-first
    activities.sort_by_key(|activity| activity.timestamp);
    activities.reverse();
    Ok(activities)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: u64, block: u64, index: u64) -> ReplayedEvent {
        ReplayedEvent {
            log: LogEntry {
                address: Address::ZERO,
                topics: vec![],
                data: vec![],
                block_number: block,
                transaction_hash: B256::ZERO,
                log_index: index,
            },
            timestamp,
        }
    }

    #[test]
    fn test_sort_ascending() {
        let mut events = vec![event(500, 5, 0), event(100, 1, 0), event(300, 3, 0)];
        sort_events(&mut events, SortOrder::Ascending);
        let times: Vec<u64> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![100, 300, 500]);
    }

    #[test]
    fn test_sort_descending() {
        let mut events = vec![event(100, 1, 0), event(500, 5, 0), event(300, 3, 0)];
        sort_events(&mut events, SortOrder::Descending);
        let times: Vec<u64> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![500, 300, 100]);
    }

    #[test]
    fn test_sort_is_deterministic_for_equal_timestamps() {
        // same block timestamp: block number then log index decide
        let mut events = vec![event(100, 7, 2), event(100, 7, 0), event(100, 6, 9)];
        sort_events(&mut events, SortOrder::Ascending);
        let keys: Vec<(u64, u64)> = events
            .iter()
            .map(|e| (e.log.block_number, e.log.log_index))
            .collect();
        assert_eq!(keys, vec![(6, 9), (7, 0), (7, 2)]);
    }

    #[test]
    fn test_sort_handles_any_permutation() {
        let base = vec![event(100, 1, 0), event(300, 3, 0), event(500, 5, 0)];
        // all 6 permutations of three events
        let orders = [
            [0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0],
        ];
        for order in orders {
            let mut events: Vec<ReplayedEvent> =
                order.iter().map(|&i| base[i].clone()).collect();
            sort_events(&mut events, SortOrder::Ascending);
            let times: Vec<u64> = events.iter().map(|e| e.timestamp).collect();
            assert_eq!(times, vec![100, 300, 500]);
        }
    }
}
