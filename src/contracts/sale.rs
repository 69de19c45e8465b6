//! Fair-launch token sale: status reads, commitment math, and calldata for
//! the commit/claim/refund writes.

use crate::chain::{codec, ChainClient};
use crate::types::{FairLaunchStatus, LaunchId, TxRequest};
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::instrument;

/// The sale contract's per-launch tuple. The status discriminant is the
/// first field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FairLaunchData {
    pub status: FairLaunchStatus,
    /// Total native value committed so far, wei
    pub total_committed: U256,
    pub start_time: u64,
    pub end_time: u64,
}

/// What a user will actually receive for a launch, accounting for
/// oversubscription: proportional tokens plus a refund of excess value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedClaim {
    pub tokens: U256,
    pub refund: U256,
}

pub struct SaleClient {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl SaleClient {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    async fn read(&self, data: Vec<u8>, what: &str) -> Result<Vec<codec::Word>> {
        let raw = self
            .chain
            .call(self.address, data)
            .await
            .with_context(|| format!("{} failed", what))?;
        codec::words(&raw)
    }

    /// Full fair-launch tuple for a launch id.
    #[instrument(skip(self))]
    pub async fn fair_launch_data(&self, id: LaunchId) -> Result<FairLaunchData> {
        let data = codec::encode_call("fairLaunchData(uint256)", &[codec::word_from_u64(id)]);
        let words = self.read(data, "fairLaunchData").await?;

        Ok(FairLaunchData {
            status: FairLaunchStatus::from_raw(codec::u8_at(&words, 0)?),
            total_committed: codec::u256_at(&words, 1)?,
            start_time: codec::u64_at(&words, 2)?,
            end_time: codec::u64_at(&words, 3)?,
        })
    }

    /// Status alone, for callers that do not need the full tuple.
    #[instrument(skip(self))]
    pub async fn fair_launch_status(&self, id: LaunchId) -> Result<FairLaunchStatus> {
        let data =
            codec::encode_call("getFairLaunchStatus(uint256)", &[codec::word_from_u64(id)]);
        let words = self.read(data, "getFairLaunchStatus").await?;
        Ok(FairLaunchStatus::from_raw(codec::u8_at(&words, 0)?))
    }

    /// Whether the launch failed and commitments can be refunded.
    #[instrument(skip(self))]
    pub async fn is_refundable(&self, id: LaunchId) -> Result<bool> {
        let data = codec::encode_call("isRefundable(uint256)", &[codec::word_from_u64(id)]);
        let words = self.read(data, "isRefundable").await?;
        codec::bool_at(&words, 0)
    }

    /// A user's committed value for a launch, wei.
    #[instrument(skip(self))]
    pub async fn user_commitment(&self, id: LaunchId, user: Address) -> Result<U256> {
        let data = codec::encode_call(
            "getUserCommitment(uint256,address)",
            &[codec::word_from_u64(id), codec::word_from_address(user)],
        );
        let words = self.read(data, "getUserCommitment").await?;
        codec::u256_at(&words, 0)
    }

    /// Tokens and refund the user would receive on claim.
    #[instrument(skip(self))]
    pub async fn expected_claim(&self, id: LaunchId, user: Address) -> Result<ExpectedClaim> {
        let data = codec::encode_call(
            "getExpectedClaim(uint256,address)",
            &[codec::word_from_u64(id), codec::word_from_address(user)],
        );
        let words = self.read(data, "getExpectedClaim").await?;
        Ok(ExpectedClaim {
            tokens: codec::u256_at(&words, 0)?,
            refund: codec::u256_at(&words, 1)?,
        })
    }

    /// Preview tokens/refund for a commitment amount, before committing.
    #[instrument(skip(self))]
    pub async fn tokens_for_commitment(
        &self,
        id: LaunchId,
        amount: U256,
    ) -> Result<ExpectedClaim> {
        let data = codec::encode_call(
            "calculateTokensForCommitment(uint256,uint256)",
            &[codec::word_from_u64(id), codec::word_from_u256(amount)],
        );
        let words = self.read(data, "calculateTokensForCommitment").await?;
        Ok(ExpectedClaim {
            tokens: codec::u256_at(&words, 0)?,
            refund: codec::u256_at(&words, 1)?,
        })
    }

    /// Fixed sale price per token, wei.
    #[instrument(skip(self))]
    pub async fn price_per_token_wei(&self) -> Result<U256> {
        let data = codec::encode_call("PRICE_PER_TOKEN_WEI()", &[]);
        let words = self.read(data, "PRICE_PER_TOKEN_WEI").await?;
        codec::u256_at(&words, 0)
    }

    /// The sale's running launch-id counter.
    #[instrument(skip(self))]
    pub async fn current_id(&self) -> Result<LaunchId> {
        let data = codec::encode_call("id()", &[]);
        let words = self.read(data, "id").await?;
        codec::u64_at(&words, 0)
    }

    /// A launch id is valid when it is positive and within the counter.
    #[instrument(skip(self))]
    pub async fn is_valid_launch_id(&self, id: LaunchId) -> Result<bool> {
        let current = self.current_id().await?;
        Ok(id > 0 && id <= current)
    }

    /// Whether a user is currently eligible to launch a new token.
    #[instrument(skip(self))]
    pub async fn is_mintable(&self, user: Address) -> Result<bool> {
        let data = codec::encode_call("isMintable(address)", &[codec::word_from_address(user)]);
        let words = self.read(data, "isMintable").await?;
        codec::bool_at(&words, 0)
    }

    /// Fair-launch window length, seconds.
    #[instrument(skip(self))]
    pub async fn fair_launch_duration(&self) -> Result<u64> {
        let data = codec::encode_call("FAIR_LAUNCH_DURATION()", &[]);
        let words = self.read(data, "FAIR_LAUNCH_DURATION").await?;
        codec::u64_at(&words, 0)
    }

    /// Raise target for each launch, wei.
    #[instrument(skip(self))]
    pub async fn raise_eth(&self) -> Result<U256> {
        let data = codec::encode_call("RAISE_ETH()", &[]);
        let words = self.read(data, "RAISE_ETH").await?;
        codec::u256_at(&words, 0)
    }

    // Write calldata builders. Commitments pay native value; the other
    // writes carry none.

    pub fn commit_request(&self, id: LaunchId, amount: U256) -> TxRequest {
        let data = codec::encode_call(
            "commitToFairLaunch(uint256,uint256)",
            &[codec::word_from_u64(id), codec::word_from_u256(amount)],
        );
        TxRequest::with_value(self.address, data, amount)
    }

    pub fn cancel_commit_request(&self, id: LaunchId) -> TxRequest {
        let data = codec::encode_call("cancelCommit(uint256)", &[codec::word_from_u64(id)]);
        TxRequest::new(self.address, data)
    }

    pub fn claim_request(&self, id: LaunchId) -> TxRequest {
        let data = codec::encode_call("claim(uint256)", &[codec::word_from_u64(id)]);
        TxRequest::new(self.address, data)
    }

    pub fn refund_request(&self, id: LaunchId) -> TxRequest {
        let data = codec::encode_call("refund(uint256)", &[codec::word_from_u64(id)]);
        TxRequest::new(self.address, data)
    }
}
