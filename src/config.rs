//! Runtime configuration for the memed-pulse data layer.

use alloy_primitives::{address, Address};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

/// Deployed addresses of the platform contracts.
///
/// Defaults point at the Base Sepolia deployment the platform currently
/// runs against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// Token factory (token metadata tuples, heat scores)
    pub factory: Address,
    /// Fair-launch token sale
    pub token_sale: Address,
    /// Battle registry
    pub battle: Address,
    /// Battle resolver
    pub battle_resolver: Address,
    /// Engage-to-earn rewards (claim / creator incentive events)
    pub engage_to_earn: Address,
    /// Chainlink ETH/USD aggregator (8 decimals)
    pub chainlink_eth_usd: Address,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            factory: address!("4632920F33f62C59cbB8baf7740A96C384B4698a"),
            token_sale: address!("2de10D81c76cd38606D2623031C8B2b8dA0A74Dc"),
            battle: address!("C8734fF910661b91E20b7430c6e517e1d594be97"),
            battle_resolver: address!("bF1FE4cF68fb540c3Fb0393349a97668B34342D6"),
            engage_to_earn: address!("10d1f4E102A9cbE0D77f355a10A81B61FB6437Ab"),
            chainlink_eth_usd: address!("4aDC67696bA383F43DD60A9e78F2C97Fbbfc7cb1"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// RPC endpoints, tried in order with per-endpoint health tracking
    pub rpc_endpoints: NonEmpty<String>,
    /// Backend REST API base URL
    pub api_base_url: String,
    /// Off-chain price API queried when the on-chain oracle yields no data
    pub fallback_price_url: String,
    /// Platform contract addresses
    pub contracts: ContractAddresses,
    /// Poll interval for contract status reads (fair launch, battles)
    pub status_poll_secs: u64,
    /// Poll interval for event-history feeds and the price oracle
    pub history_poll_secs: u64,
    /// Look-back window for event replay, in blocks
    pub max_blocks_back: u64,
    /// Upper bound on tokens fetched per aggregator batch; ids beyond it
    /// are truncated loudly
    pub max_batch_tokens: usize,
    /// RPC request timeout in seconds
    pub rpc_timeout_secs: u64,
    /// RPC requests per second across all endpoints
    pub rate_limit_rps: u32,
    /// Consecutive failures before an endpoint is quarantined
    pub endpoint_failure_threshold: u32,
    /// Endpoint quarantine duration in seconds
    pub endpoint_cooldown_secs: u64,
    /// TTL for the cached fallback price, in seconds
    pub fallback_cache_ttl_secs: u64,
    /// TTL for cached backend token metadata, in seconds
    pub token_cache_ttl_secs: u64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            rpc_endpoints: NonEmpty::new("https://sepolia.base.org".to_string()),
            api_base_url: "https://api.memed.fun".to_string(),
            fallback_price_url:
                "https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd"
                    .to_string(),
            contracts: ContractAddresses::default(),
            status_poll_secs: 5,
            history_poll_secs: 30,
            max_blocks_back: 100_000,
            max_batch_tokens: 20,
            rpc_timeout_secs: 10,
            rate_limit_rps: 20,
            endpoint_failure_threshold: 5,
            endpoint_cooldown_secs: 60,
            fallback_cache_ttl_secs: 60,
            token_cache_ttl_secs: 300,
        }
    }
}

impl PulseConfig {
    /// Build a config from defaults plus environment overrides.
    ///
    /// Recognized variables: `MEMED_RPC_URLS` (comma separated),
    /// `MEMED_API_URL`, `MEMED_FALLBACK_PRICE_URL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(urls) = std::env::var("MEMED_RPC_URLS") {
            let endpoints: Vec<String> = urls
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if let Some(endpoints) = NonEmpty::from_vec(endpoints) {
                config.rpc_endpoints = endpoints;
            }
        }

        if let Ok(url) = std::env::var("MEMED_API_URL") {
            config.api_base_url = url;
        }

        if let Ok(url) = std::env::var("MEMED_FALLBACK_PRICE_URL") {
            config.fallback_price_url = url;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PulseConfig::default();

        assert_eq!(config.rpc_endpoints.len(), 1);
        assert_eq!(config.status_poll_secs, 5);
        assert_eq!(config.history_poll_secs, 30);
        assert_eq!(config.max_blocks_back, 100_000);
        assert_eq!(config.max_batch_tokens, 20);
        assert_eq!(config.fallback_cache_ttl_secs, 60);
    }

    #[test]
    fn test_default_addresses_are_distinct() {
        let contracts = ContractAddresses::default();
        let all = [
            contracts.factory,
            contracts.token_sale,
            contracts.battle,
            contracts.battle_resolver,
            contracts.engage_to_earn,
            contracts.chainlink_eth_usd,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
