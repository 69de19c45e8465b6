//! Battle feeds: live battles for a token, settled history, and the
//! per-side display details joined from the backend.

use crate::api::{short_address, BackendClient};
use crate::contracts::{Battle, BattleClient};
use crate::types::BattleStatus;
use alloy_primitives::Address;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Display details for one side of a battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDetails {
    pub name: String,
    pub image: String,
}

impl TokenDetails {
    /// Label used when the backend has nothing for an address.
    fn placeholder(address: Address) -> Self {
        Self { name: short_address(address), image: String::new() }
    }
}

/// A battle list snapshot for one token, replaced wholesale per poll.
#[derive(Debug, Clone, Default)]
pub struct BattleFeedSnapshot {
    pub battles: Vec<Battle>,
    /// Name/image per token address appearing in `battles`
    pub details: HashMap<Address, TokenDetails>,
}

pub struct BattleFeed {
    battle: Arc<BattleClient>,
    backend: Arc<BackendClient>,
}

impl BattleFeed {
    pub fn new(battle: Arc<BattleClient>, backend: Arc<BackendClient>) -> Self {
        Self { battle, backend }
    }

    /// Battles currently running that involve `token`.
    #[instrument(skip(self))]
    pub async fn active_battles_for(&self, token: Address) -> Result<BattleFeedSnapshot> {
        let battles = self.battle.battles().await?;
        let active = filter_active(&battles, token);
        debug!("{} active battles involve {}", active.len(), token);

        let details = self.token_details(&active).await;
        Ok(BattleFeedSnapshot { battles: active, details })
    }

    /// Settled battles (resolved or drawn) that involved `token`, newest
    /// ending first.
    #[instrument(skip(self))]
    pub async fn battle_history_for(&self, token: Address) -> Result<BattleFeedSnapshot> {
        let battles = self.battle.battles().await?;
        let mut history: Vec<Battle> = battles
            .into_iter()
            .filter(|battle| battle.status.is_terminal() && battle.involves(token))
            .collect();
        history.sort_by_key(|battle| battle.end_time);
        history.reverse();

        let details = self.token_details(&history).await;
        Ok(BattleFeedSnapshot { battles: history, details })
    }

    /// Resolve name/image for every token appearing in `battles`. A
    /// backend miss degrades that one entry to a shortened-address label;
    /// it never fails the feed.
    async fn token_details(&self, battles: &[Battle]) -> HashMap<Address, TokenDetails> {
        let mut addresses = HashSet::new();
        for battle in battles {
            addresses.insert(battle.meme_a);
            addresses.insert(battle.meme_b);
        }

        let mut details = HashMap::new();
        for address in addresses {
            let entry = match self.backend.token_by_address(address).await {
                Ok(record) => TokenDetails {
                    name: record.display_name(),
                    image: record.image_key().unwrap_or_default().to_string(),
                },
                Err(err) => {
                    debug!("no backend record for {}: {:#}", address, err);
                    TokenDetails::placeholder(address)
                }
            };
            details.insert(address, entry);
        }
        details
    }
}

/// Started battles involving `token`.
pub fn filter_active(battles: &[Battle], token: Address) -> Vec<Battle> {
    battles
        .iter()
        .filter(|battle| battle.status == BattleStatus::Started && battle.involves(token))
        .copied()
        .collect()
}

/// Client-side page over an already-fetched list. The backend paginates
/// the token list; battle lists arrive whole and are sliced here.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Vec<T> {
    if per_page == 0 {
        return Vec::new();
    }
    items
        .iter()
        .skip(page * per_page)
        .take(per_page)
        .cloned()
        .collect()
}

/// Number of pages a list occupies at `per_page` items each.
pub fn page_count(total: usize, per_page: usize) -> usize {
    if per_page == 0 {
        0
    } else {
        total.div_ceil(per_page)
    }
}

/// Warn when a refreshed battle violates the monotonic-growth expectation
/// for live battles. Purely diagnostic; the newer snapshot still wins.
pub fn check_monotonic_growth(previous: &Battle, current: &Battle) {
    if current.status != BattleStatus::Started {
        return;
    }
    if current.heat_a < previous.heat_a
        || current.heat_b < previous.heat_b
        || current.a_allocated < previous.a_allocated
        || current.b_allocated < previous.b_allocated
    {
        warn!(
            "battle {} regressed heat/allocation between polls",
            current.battle_id
        );
    }
}
