//! Transaction submission states and error classification.
//!
//! Signing lives outside this crate; a `TxSubmitter` hands back a hash and
//! the tracker polls the receipt until the transaction settles. There is
//! no automatic retry: a failed attempt is terminal and retried only by
//! the user.

use crate::chain::ChainClient;
use crate::types::TxRequest;
use alloy_primitives::B256;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

/// User-facing category of a write failure, pattern-matched from the
/// error text the wallet/node produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxErrorKind {
    /// The user declined the signature prompt
    UserRejected,
    /// Not enough balance for value + gas
    InsufficientFunds,
    /// Anything else, carried verbatim
    Other(String),
}

/// Map raw error text onto the categories the UI distinguishes.
pub fn classify_tx_error(message: &str) -> TxErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("user rejected") || lower.contains("user denied") {
        TxErrorKind::UserRejected
    } else if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
        TxErrorKind::InsufficientFunds
    } else {
        TxErrorKind::Other(message.to_string())
    }
}

/// Lifecycle of a tracked write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Submitted, hash not yet known
    Pending,
    /// Hash known, waiting for inclusion
    Confirming { hash: B256 },
    /// Included and successful
    Confirmed { hash: B256, block_number: u64 },
    /// Rejected, reverted, or failed to submit
    Failed { kind: TxErrorKind },
}

impl TxStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, TxStatus::Confirmed { .. } | TxStatus::Failed { .. })
    }
}

/// Signs and broadcasts a transaction, returning its hash. Implemented by
/// whatever wallet integration embeds this crate.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    async fn submit(&self, request: TxRequest) -> Result<B256>;
}

/// Polls receipts for submitted transactions.
pub struct TxTracker {
    chain: Arc<dyn ChainClient>,
    poll_interval: Duration,
}

impl TxTracker {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain, poll_interval: Duration::from_secs(2) }
    }

    pub fn with_poll_interval(chain: Arc<dyn ChainClient>, poll_interval: Duration) -> Self {
        Self { chain, poll_interval }
    }

    /// Submit through `submitter` and follow the transaction to
    /// settlement. Every state transition is published on the returned
    /// channel; the final value is settled.
    #[instrument(skip(self, submitter, request))]
    pub fn submit_and_track(
        &self,
        submitter: Arc<dyn TxSubmitter>,
        request: TxRequest,
    ) -> watch::Receiver<TxStatus> {
        let (sender, receiver) = watch::channel(TxStatus::Pending);
        let chain = Arc::clone(&self.chain);
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let hash = match submitter.submit(request).await {
                Ok(hash) => hash,
                Err(err) => {
                    let kind = classify_tx_error(&format!("{:#}", err));
                    warn!("transaction submission failed: {:#}", err);
                    let _ = sender.send(TxStatus::Failed { kind });
                    return;
                }
            };

            debug!("transaction {} submitted, waiting for receipt", hash);
            let _ = sender.send(TxStatus::Confirming { hash });

            let status = Self::wait_for_receipt(&chain, hash, poll_interval).await;
            let _ = sender.send(status);
        });

        receiver
    }

    /// Follow an already-submitted hash to settlement.
    #[instrument(skip(self))]
    pub async fn wait(&self, hash: B256) -> TxStatus {
        Self::wait_for_receipt(&self.chain, hash, self.poll_interval).await
    }

    async fn wait_for_receipt(
        chain: &Arc<dyn ChainClient>,
        hash: B256,
        poll_interval: Duration,
    ) -> TxStatus {
        loop {
            match chain.transaction_receipt(hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    debug!("transaction {} confirmed in block {}", hash, receipt.block_number);
                    return TxStatus::Confirmed { hash, block_number: receipt.block_number };
                }
                Ok(Some(_)) => {
                    warn!("transaction {} reverted", hash);
                    return TxStatus::Failed {
                        kind: TxErrorKind::Other(format!("transaction {} reverted", hash)),
                    };
                }
                Ok(None) => {}
                Err(err) => {
                    // transient lookup failure: keep polling, the receipt
                    // query itself is not the transaction failing
                    debug!("receipt lookup for {} failed: {:#}", hash, err);
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{LogEntry, LogFilter, TxReceipt};
    use alloy_primitives::{Address, U256};
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_classify_user_rejection() {
        assert_eq!(
            classify_tx_error("User rejected the request."),
            TxErrorKind::UserRejected
        );
        assert_eq!(
            classify_tx_error("MetaMask Tx Signature: User denied transaction signature."),
            TxErrorKind::UserRejected
        );
    }

    #[test]
    fn test_classify_insufficient_funds() {
        assert_eq!(
            classify_tx_error("insufficient funds for gas * price + value"),
            TxErrorKind::InsufficientFunds
        );
    }

    #[test]
    fn test_classify_other_keeps_message() {
        let kind = classify_tx_error("execution reverted: launch not active");
        assert_eq!(
            kind,
            TxErrorKind::Other("execution reverted: launch not active".to_string())
        );
    }

    /// Receipt appears after a configurable number of lookups.
    struct DelayedReceiptChain {
        lookups_until_receipt: u64,
        lookups: AtomicU64,
        success: bool,
    }

    #[async_trait]
    impl ChainClient for DelayedReceiptChain {
        async fn call(&self, _to: Address, _data: Vec<u8>) -> Result<Vec<u8>> {
            Err(anyhow!("not used"))
        }
        async fn block_number(&self) -> Result<u64> {
            Ok(0)
        }
        async fn get_logs(&self, _filter: &LogFilter) -> Result<Vec<LogEntry>> {
            Ok(vec![])
        }
        async fn block_timestamp(&self, _number: u64) -> Result<u64> {
            Ok(0)
        }
        async fn transaction_receipt(&self, _hash: B256) -> Result<Option<TxReceipt>> {
            let seen = self.lookups.fetch_add(1, Ordering::SeqCst);
            if seen + 1 >= self.lookups_until_receipt {
                Ok(Some(TxReceipt { success: self.success, block_number: 77 }))
            } else {
                Ok(None)
            }
        }
    }

    struct OkSubmitter;

    #[async_trait]
    impl TxSubmitter for OkSubmitter {
        async fn submit(&self, _request: TxRequest) -> Result<B256> {
            Ok(B256::repeat_byte(0x99))
        }
    }

    struct RejectingSubmitter;

    #[async_trait]
    impl TxSubmitter for RejectingSubmitter {
        async fn submit(&self, _request: TxRequest) -> Result<B256> {
            Err(anyhow!("User rejected the request."))
        }
    }

    fn request() -> TxRequest {
        TxRequest::with_value(Address::repeat_byte(0x22), vec![1, 2, 3], U256::ZERO)
    }

    #[tokio::test]
    async fn test_submit_and_confirm() {
        let chain = Arc::new(DelayedReceiptChain {
            lookups_until_receipt: 3,
            lookups: AtomicU64::new(0),
            success: true,
        });
        let tracker = TxTracker::with_poll_interval(chain, Duration::from_millis(1));

        let mut receiver = tracker.submit_and_track(Arc::new(OkSubmitter), request());
        while !receiver.borrow().is_settled() {
            receiver.changed().await.unwrap();
        }

        let status = receiver.borrow().clone();
        assert_eq!(
            status,
            TxStatus::Confirmed { hash: B256::repeat_byte(0x99), block_number: 77 }
        );
    }

    #[tokio::test]
    async fn test_reverted_transaction_fails_terminally() {
        let chain = Arc::new(DelayedReceiptChain {
            lookups_until_receipt: 1,
            lookups: AtomicU64::new(0),
            success: false,
        });
        let tracker = TxTracker::with_poll_interval(chain, Duration::from_millis(1));

        let status = tracker.wait(B256::repeat_byte(0x55)).await;
        assert!(matches!(status, TxStatus::Failed { kind: TxErrorKind::Other(_) }));
    }

    #[tokio::test]
    async fn test_submission_rejection_is_classified() {
        let chain = Arc::new(DelayedReceiptChain {
            lookups_until_receipt: 1,
            lookups: AtomicU64::new(0),
            success: true,
        });
        let tracker = TxTracker::with_poll_interval(chain, Duration::from_millis(1));

        let mut receiver = tracker.submit_and_track(Arc::new(RejectingSubmitter), request());
        while !receiver.borrow().is_settled() {
            receiver.changed().await.unwrap();
        }

        assert_eq!(
            receiver.borrow().clone(),
            TxStatus::Failed { kind: TxErrorKind::UserRejected }
        );
    }
}
