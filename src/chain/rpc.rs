//! JSON-RPC transport for `ChainClient`.
//!
//! Requests are rate limited globally and routed across the configured
//! endpoints with per-endpoint quarantine on repeated failure.

use crate::chain::health::EndpointBreaker;
use crate::chain::{ChainClient, LogEntry, LogFilter, TxReceipt};
use crate::config::PulseConfig;
use alloy_primitives::{hex, Address, B256};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonempty::NonEmpty;
use serde::Deserialize;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

/// Raw log object as returned by `eth_getLogs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    address: Address,
    topics: Vec<B256>,
    data: String,
    block_number: String,
    transaction_hash: B256,
    log_index: String,
}

fn quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

fn parse_quantity(value: &str) -> Result<u64> {
    let trimmed = value.trim_start_matches("0x");
    u64::from_str_radix(trimmed, 16)
        .with_context(|| format!("invalid hex quantity {:?}", value))
}

fn parse_bytes(value: &str) -> Result<Vec<u8>> {
    hex::decode(value).with_context(|| format!("invalid hex data {:?}", value))
}

/// `ChainClient` over HTTP JSON-RPC.
pub struct RpcChainClient {
    endpoints: NonEmpty<String>,
    http: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
    breaker: Mutex<EndpointBreaker>,
    next_id: AtomicU64,
}

impl RpcChainClient {
    pub fn new(config: &PulseConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.rpc_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let rps = NonZeroU32::new(config.rate_limit_rps)
            .unwrap_or_else(|| NonZeroU32::new(10).unwrap());
        let limiter = RateLimiter::direct(Quota::per_second(rps));

        let breaker = EndpointBreaker::new(
            config.endpoint_failure_threshold,
            Duration::from_secs(config.endpoint_cooldown_secs),
        );

        Ok(Self {
            endpoints: config.rpc_endpoints.clone(),
            http,
            limiter,
            breaker: Mutex::new(breaker),
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC request, trying endpoints in order and skipping
    /// quarantined ones.
    #[instrument(skip(self, params))]
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.limiter.until_ready().await;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut last_error = anyhow!("no RPC endpoint available for {}", method);
        for endpoint in self.endpoints.iter() {
            {
                let mut breaker = self.breaker.lock().await;
                if !breaker.is_available(endpoint) {
                    continue;
                }
            }

            match self.send(endpoint, &body).await {
                Ok(result) => {
                    self.breaker.lock().await.record_success(endpoint);
                    return Ok(result);
                }
                Err(err) => {
                    warn!("{} failed on {}: {:#}", method, endpoint, err);
                    self.breaker.lock().await.record_failure(endpoint);
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }

    async fn send(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let response: RpcResponse = self
            .http
            .post(endpoint)
            .json(body)
            .send()
            .await
            .context("transport error")?
            .json()
            .await
            .context("malformed JSON-RPC response")?;

        if let Some(error) = response.error {
            return Err(anyhow!("RPC error {}: {}", error.code, error.message));
        }

        response.result.ok_or_else(|| anyhow!("empty JSON-RPC result"))
    }

    async fn request_as<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value).with_context(|| format!("decoding {} result", method))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let params = json!([
            { "to": to, "data": hex::encode_prefixed(&data) },
            "latest",
        ]);
        let result: String = self.request_as("eth_call", params).await?;
        parse_bytes(&result)
    }

    async fn block_number(&self) -> Result<u64> {
        let result: String = self.request_as("eth_blockNumber", json!([])).await?;
        parse_quantity(&result)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let topics: Vec<Value> = match filter.topic1 {
            Some(topic1) => vec![json!(filter.topic0), json!(topic1)],
            None => vec![json!(filter.topic0)],
        };
        let params = json!([{
            "address": filter.address,
            "topics": topics,
            "fromBlock": quantity(filter.from_block),
            "toBlock": quantity(filter.to_block),
        }]);

        let raw: Vec<RawLog> = self.request_as("eth_getLogs", params).await?;
        debug!("eth_getLogs returned {} entries", raw.len());

        raw.into_iter()
            .map(|log| {
                Ok(LogEntry {
                    address: log.address,
                    topics: log.topics,
                    data: parse_bytes(&log.data)?,
                    block_number: parse_quantity(&log.block_number)?,
                    transaction_hash: log.transaction_hash,
                    log_index: parse_quantity(&log.log_index)?,
                })
            })
            .collect()
    }

    async fn block_timestamp(&self, number: u64) -> Result<u64> {
        let params = json!([quantity(number), false]);
        let block: Value = self.request("eth_getBlockByNumber", params).await?;
        let timestamp = block
            .get("timestamp")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("block {} has no timestamp", number))?;
        parse_quantity(timestamp)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        let receipt: Value = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if receipt.is_null() {
            return Ok(None);
        }

        let status = receipt
            .get("status")
            .and_then(Value::as_str)
            .map(parse_quantity)
            .transpose()?
            .unwrap_or(0);
        let block_number = receipt
            .get("blockNumber")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("receipt for {} has no block number", hash))
            .and_then(|s| parse_quantity(s))?;

        Ok(Some(TxReceipt {
            success: status == 1,
            block_number,
        }))
    }
}
