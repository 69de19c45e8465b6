//! In-memory chain used by the integration tests.
#![allow(dead_code)]

use alloy_primitives::{Address, B256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use memed_pulse::chain::{ChainClient, LogEntry, LogFilter, TxReceipt};
use std::collections::HashMap;

/// A chain whose reads are scripted per (contract, calldata) pair.
#[derive(Default)]
pub struct MockChain {
    latest_block: u64,
    calls: HashMap<(Address, Vec<u8>), Result<Vec<u8>, String>>,
    logs: Vec<LogEntry>,
    timestamps: HashMap<u64, u64>,
}

impl MockChain {
    pub fn new(latest_block: u64) -> Self {
        Self { latest_block, ..Self::default() }
    }

    pub fn with_call(mut self, to: Address, data: Vec<u8>, response: Vec<u8>) -> Self {
        self.calls.insert((to, data), Ok(response));
        self
    }

    pub fn with_failing_call(mut self, to: Address, data: Vec<u8>, message: &str) -> Self {
        self.calls.insert((to, data), Err(message.to_string()));
        self
    }

    pub fn with_log(mut self, log: LogEntry) -> Self {
        self.logs.push(log);
        self
    }

    pub fn with_block(mut self, number: u64, timestamp: u64) -> Self {
        self.timestamps.insert(number, timestamp);
        self
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        match self.calls.get(&(to, data)) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(anyhow!("{}", message)),
            None => Err(anyhow!("unexpected call to {}", to)),
        }
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.latest_block)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        Ok(self
            .logs
            .iter()
            .filter(|log| log.address == filter.address)
            .filter(|log| log.topics.first() == Some(&filter.topic0))
            .filter(|log| match filter.topic1 {
                Some(topic1) => log.topics.get(1) == Some(&topic1),
                None => true,
            })
            .filter(|log| {
                log.block_number >= filter.from_block && log.block_number <= filter.to_block
            })
            .cloned()
            .collect())
    }

    async fn block_timestamp(&self, number: u64) -> Result<u64> {
        self.timestamps
            .get(&number)
            .copied()
            .ok_or_else(|| anyhow!("unknown block {}", number))
    }

    async fn transaction_receipt(&self, _hash: B256) -> Result<Option<TxReceipt>> {
        Ok(None)
    }
}
