//! Batched per-token contract data.
//!
//! Pages display many token cards at once; fetching three contract reads
//! per card from each card would multiply identical calls. The aggregator
//! fetches once per distinct launch id, all ids in parallel, and hands the
//! consolidated map down as a single snapshot.
//!
//! The platform front-end this replaces had to pad its fetch list to a
//! fixed 20 slots because its reactive-fetch primitive required a static
//! subscription count. Futures have no such restriction, so exactly one
//! fetch per id runs here and no placeholder ids exist. The historical
//! bound survives only as `max_batch`, an RPC-burst cap that truncates
//! loudly.

use crate::contracts::{FactoryClient, FairLaunchData, SaleClient, TokenOnChain};
use crate::types::{FairLaunchStatus, LaunchId};
use anyhow::Error;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Consolidated contract state for one token.
#[derive(Debug, Clone, Default)]
pub struct TokenContractData {
    /// Factory record; `None` when the read errored
    pub token_data: Option<TokenOnChain>,
    /// Sale tuple; `None` when the read errored
    pub fair_launch: Option<FairLaunchData>,
    /// Refundability flag; `None` when the read errored
    pub is_refundable: Option<bool>,
    /// The creator has not claimed the token. False when the token read
    /// errored.
    pub is_unclaimed: bool,
    /// The launch failed or became refundable
    pub is_failed: bool,
    pub status: FairLaunchStatus,
    /// First error hit by this entry's reads, if any
    pub error: Option<Arc<Error>>,
}

/// One aggregator snapshot: a map from launch id to consolidated data plus
/// batch-level progress flags. Superseded wholesale on every poll, never
/// patched in place.
#[derive(Debug, Clone, Default)]
pub struct TokensBatchData {
    pub data: HashMap<LaunchId, TokenContractData>,
    /// True while any entry is still in flight
    pub is_loading: bool,
    /// True only once every entry settled, successfully or not
    pub is_complete: bool,
}

impl TokensBatchData {
    /// The snapshot published before the first fetch settles.
    pub fn pending() -> Self {
        Self { data: HashMap::new(), is_loading: true, is_complete: false }
    }

    pub fn get(&self, id: LaunchId) -> Option<&TokenContractData> {
        self.data.get(&id)
    }
}

pub struct BatchAggregator {
    factory: Arc<FactoryClient>,
    sale: Arc<SaleClient>,
    /// Upper bound on ids fetched per batch
    max_batch: usize,
}

impl BatchAggregator {
    pub fn new(factory: Arc<FactoryClient>, sale: Arc<SaleClient>, max_batch: usize) -> Self {
        Self { factory, sale, max_batch }
    }

    /// Drop absent/zero ids, deduplicate preserving first-seen order, and
    /// truncate to the batch cap.
    fn sanitize(&self, ids: &[Option<LaunchId>]) -> Vec<LaunchId> {
        let mut seen = HashSet::new();
        let mut valid: Vec<LaunchId> = ids
            .iter()
            .filter_map(|id| *id)
            .filter(|id| *id != 0)
            .filter(|id| seen.insert(*id))
            .collect();

        if valid.len() > self.max_batch {
            warn!(
                "token batch truncated: {} of {} ids dropped at the {}-id cap",
                valid.len() - self.max_batch,
                valid.len(),
                self.max_batch
            );
            valid.truncate(self.max_batch);
        }

        valid
    }

    /// Fetch the consolidated record for every distinct id in `ids`.
    ///
    /// All per-id fetches run concurrently and each id's three reads run
    /// concurrently within it. A failing read marks its own entry only;
    /// sibling entries and sibling reads settle independently. The
    /// returned snapshot is fully settled.
    #[instrument(skip(self, ids))]
    pub async fn fetch(&self, ids: &[Option<LaunchId>]) -> TokensBatchData {
        let valid = self.sanitize(ids);
        debug!("aggregating contract data for {} tokens", valid.len());

        let fetches = valid.iter().map(|id| self.fetch_single(*id));
        let entries = join_all(fetches).await;

        TokensBatchData {
            data: valid.into_iter().zip(entries).collect(),
            is_loading: false,
            is_complete: true,
        }
    }

    /// The three per-token reads, issued concurrently.
    async fn fetch_single(&self, id: LaunchId) -> TokenContractData {
        let (token_result, launch_result, refundable_result) = tokio::join!(
            self.factory.token_data(id),
            self.sale.fair_launch_data(id),
            self.sale.is_refundable(id),
        );

        let mut error = None;
        let mut remember = |err: Error| {
            debug!("token {} read failed: {:#}", id, err);
            if error.is_none() {
                error = Some(Arc::new(err));
            }
        };

        let token_data = match token_result {
            Ok(data) => Some(data),
            Err(err) => {
                remember(err);
                None
            }
        };
        let fair_launch = match launch_result {
            Ok(data) => Some(data),
            Err(err) => {
                remember(err);
                None
            }
        };
        let is_refundable = match refundable_result {
            Ok(flag) => Some(flag),
            Err(err) => {
                remember(err);
                None
            }
        };

        // unclaimed only when the token read actually succeeded
        let is_unclaimed = token_data
            .map(|data| !data.is_claimed_by_creator)
            .unwrap_or(false);
        let status = fair_launch.map(|fl| fl.status).unwrap_or_default();
        let is_failed = is_refundable == Some(true) || status == FairLaunchStatus::Failed;

        TokenContractData {
            token_data,
            fair_launch,
            is_refundable,
            is_unclaimed,
            is_failed,
            status,
            error,
        }
    }
}

/// The failure rule on its own, for exhaustive truth-table testing:
/// a launch counts as failed when it is refundable or its status reads
/// `Failed`.
pub fn derive_is_failed(is_refundable: Option<bool>, status: Option<FairLaunchStatus>) -> bool {
    is_refundable == Some(true) || status == Some(FairLaunchStatus::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_failed_truth_table() {
        use FairLaunchStatus::*;

        let statuses = [None, Some(NotStarted), Some(Active), Some(Completed), Some(Failed)];
        let refundables = [None, Some(false), Some(true)];

        for status in statuses {
            for refundable in refundables {
                let expected = refundable == Some(true) || status == Some(Failed);
                assert_eq!(
                    derive_is_failed(refundable, status),
                    expected,
                    "refundable={:?} status={:?}",
                    refundable,
                    status
                );
            }
        }
    }

    #[test]
    fn test_pending_snapshot_flags() {
        let pending = TokensBatchData::pending();
        assert!(pending.is_loading);
        assert!(!pending.is_complete);
        assert!(pending.data.is_empty());
    }
}
