//! ETH/USD price feed.
//!
//! Primary source is the on-chain Chainlink aggregator; when it yields no
//! usable answer the feed falls back to an off-chain price API whose
//! result is cached for a short TTL in explicit `{value, fetched_at}`
//! state owned by the feed.

use crate::chain::{codec, ChainClient};
use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, instrument, warn};

/// A round older than this is flagged stale.
pub const PRICE_STALENESS_SECS: u64 = 3600;

/// How long a fallback quote stays valid.
pub const FALLBACK_CACHE_TTL: Duration = Duration::from_secs(60);

/// Chainlink aggregator prices carry 8 decimals.
pub const PRICE_DECIMALS: u32 = 8;

/// Where a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Chainlink,
    Fallback,
}

/// An ETH/USD quote with 8-decimal fixed-point price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthUsdPrice {
    pub price: U256,
    /// When the source last updated, unix seconds
    pub updated_at: u64,
    /// True when the on-chain round is older than the staleness threshold
    pub is_stale: bool,
    pub source: PriceSource,
}

/// Off-chain price source used when the on-chain oracle yields nothing.
#[async_trait]
pub trait FallbackPriceSource: Send + Sync {
    /// Current ETH price in USD.
    async fn fetch_usd_price(&self) -> Result<f64>;
}

/// CoinGecko-style HTTP source with retry.
pub struct HttpFallbackSource {
    http: reqwest::Client,
    url: String,
}

impl HttpFallbackSource {
    pub fn new(http: reqwest::Client, url: String) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl FallbackPriceSource for HttpFallbackSource {
    #[instrument(skip(self))]
    async fn fetch_usd_price(&self) -> Result<f64> {
        let retry_strategy = ExponentialBackoff::from_millis(500)
            .max_delay(Duration::from_secs(3))
            .take(3);

        Retry::spawn(retry_strategy, || async {
            let response = self
                .http
                .get(&self.url)
                .send()
                .await?
                .json::<serde_json::Value>()
                .await?;

            let price = response["ethereum"]["usd"]
                .as_f64()
                .context("failed to parse ETH price from fallback API")?;

            debug!("fetched fallback ETH price: ${:.2}", price);
            Ok(price)
        })
        .await
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedFallback {
    price: U256,
    fetched_at: Instant,
}

/// The feed itself. Cheap to share behind an `Arc`; the fallback cache is
/// written by one fetch at a time and read by everyone.
pub struct EthUsdFeed {
    chain: Arc<dyn ChainClient>,
    address: Address,
    fallback: Arc<dyn FallbackPriceSource>,
    cache: Mutex<Option<CachedFallback>>,
    cache_ttl: Duration,
}

impl EthUsdFeed {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        address: Address,
        fallback: Arc<dyn FallbackPriceSource>,
    ) -> Self {
        Self::with_cache_ttl(chain, address, fallback, FALLBACK_CACHE_TTL)
    }

    pub fn with_cache_ttl(
        chain: Arc<dyn ChainClient>,
        address: Address,
        fallback: Arc<dyn FallbackPriceSource>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            chain,
            address,
            fallback,
            cache: Mutex::new(None),
            cache_ttl,
        }
    }

    /// Latest quote: Chainlink when it answers, fallback otherwise.
    #[instrument(skip(self))]
    pub async fn latest(&self) -> Result<EthUsdPrice> {
        match self.latest_round().await {
            Ok(Some(quote)) => Ok(quote),
            Ok(None) => {
                debug!("oracle returned no answer, using fallback");
                self.fallback_price().await
            }
            Err(err) => {
                warn!("oracle read failed, using fallback: {:#}", err);
                self.fallback_price().await
            }
        }
    }

    /// Read `latestRoundData()`; `None` when the aggregator has no usable
    /// answer (zero or negative).
    async fn latest_round(&self) -> Result<Option<EthUsdPrice>> {
        let data = codec::encode_call("latestRoundData()", &[]);
        let raw = self
            .chain
            .call(self.address, data)
            .await
            .context("latestRoundData failed")?;
        let words = codec::words(&raw)?;

        // (roundId, answer, startedAt, updatedAt, answeredInRound)
        let answer = codec::u256_at(&words, 1)?;
        let updated_at = codec::u64_at(&words, 3)?;

        // int256 answer: zero or negative means the round carries no data
        let negative = words[1][0] & 0x80 != 0;
        if answer.is_zero() || negative {
            return Ok(None);
        }

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let is_stale = now.saturating_sub(updated_at) > PRICE_STALENESS_SECS;

        Ok(Some(EthUsdPrice {
            price: answer,
            updated_at,
            is_stale,
            source: PriceSource::Chainlink,
        }))
    }

    /// Serve the cached fallback quote while fresh, refetch otherwise.
    async fn fallback_price(&self) -> Result<EthUsdPrice> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = *cache {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                debug!("serving cached fallback price");
                return Ok(self.quote_from_fallback(cached.price));
            }
        }

        let usd = self.fallback.fetch_usd_price().await?;
        if !usd.is_finite() || usd <= 0.0 {
            return Err(anyhow!("fallback API returned unusable price {}", usd));
        }

        let scaled = (usd * 10f64.powi(PRICE_DECIMALS as i32)).round() as u128;
        let price = U256::from(scaled);
        *cache = Some(CachedFallback { price, fetched_at: Instant::now() });

        Ok(self.quote_from_fallback(price))
    }

    fn quote_from_fallback(&self, price: U256) -> EthUsdPrice {
        EthUsdPrice {
            price,
            updated_at: chrono::Utc::now().timestamp().max(0) as u64,
            is_stale: false,
            source: PriceSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{LogEntry, LogFilter, TxReceipt};
    use alloy_primitives::B256;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Chain whose latestRoundData always answers with the given words.
    struct FixedChain {
        answer: U256,
        updated_at: u64,
    }

    #[async_trait]
    impl ChainClient for FixedChain {
        async fn call(&self, _to: Address, _data: Vec<u8>) -> Result<Vec<u8>> {
            let words = [
                codec::word_from_u64(1),
                codec::word_from_u256(self.answer),
                codec::word_from_u64(self.updated_at),
                codec::word_from_u64(self.updated_at),
                codec::word_from_u64(1),
            ];
            Ok(words.concat())
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
            Ok(None)
        }
    }

    /// Counts how many times the fallback API is actually hit.
    struct CountingFallback {
        calls: AtomicU64,
        price: f64,
    }

    impl CountingFallback {
        fn new(price: f64) -> Self {
            Self { calls: AtomicU64::new(0), price }
        }
    }

    #[async_trait]
    impl FallbackPriceSource for CountingFallback {
        async fn fetch_usd_price(&self) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.price)
        }
    }

    fn feed_with(chain: FixedChain, fallback: Arc<CountingFallback>) -> EthUsdFeed {
        EthUsdFeed::new(Arc::new(chain), Address::repeat_byte(0x4a), fallback)
    }

    #[tokio::test]
    async fn test_chainlink_answer_used_when_present() {
        let now = chrono::Utc::now().timestamp() as u64;
        let fallback = Arc::new(CountingFallback::new(9999.0));
        let feed = feed_with(
            FixedChain { answer: U256::from(250_000_000_000u64), updated_at: now },
            fallback.clone(),
        );

        let quote = feed.latest().await.unwrap();
        assert_eq!(quote.source, PriceSource::Chainlink);
        assert_eq!(quote.price, U256::from(250_000_000_000u64));
        assert!(!quote.is_stale);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_round_is_flagged() {
        let now = chrono::Utc::now().timestamp() as u64;
        let fallback = Arc::new(CountingFallback::new(9999.0));
        let feed = feed_with(
            FixedChain {
                answer: U256::from(250_000_000_000u64),
                updated_at: now - PRICE_STALENESS_SECS - 100,
            },
            fallback,
        );

        let quote = feed.latest().await.unwrap();
        assert_eq!(quote.source, PriceSource::Chainlink);
        assert!(quote.is_stale);
    }

    #[tokio::test]
    async fn test_fallback_on_empty_answer_and_cache_reuse() {
        let fallback = Arc::new(CountingFallback::new(2500.0));
        let feed = feed_with(
            FixedChain { answer: U256::ZERO, updated_at: 0 },
            fallback.clone(),
        );

        // two consecutive empty on-chain reads within the TTL: the
        // fallback API is hit exactly once
        let first = feed.latest().await.unwrap();
        let second = feed.latest().await.unwrap();

        assert_eq!(first.source, PriceSource::Fallback);
        assert_eq!(first.price, U256::from(250_000_000_000u64));
        assert_eq!(second.price, first.price);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_cache_expiry() {
        let fallback = Arc::new(CountingFallback::new(2500.0));
        let feed = EthUsdFeed::with_cache_ttl(
            Arc::new(FixedChain { answer: U256::ZERO, updated_at: 0 }),
            Address::repeat_byte(0x4a),
            fallback.clone(),
            Duration::from_millis(0),
        );

        feed.latest().await.unwrap();
        feed.latest().await.unwrap();
        // zero TTL: every request refetches
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 2);
    }
}
