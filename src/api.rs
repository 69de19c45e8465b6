//! Client for the platform backend REST API.
//!
//! The backend owns token metadata, search, and list pagination; whatever
//! it returns is trusted as-is. Per-address lookups are cached with a TTL
//! since battle and card views ask for the same tokens repeatedly.

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, instrument};

/// Display metadata attached to a token at launch time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub description: Option<String>,
    pub image_key: Option<String>,
}

/// Uploaded image reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenImage {
    pub s3_key: Option<String>,
}

/// A token as the backend stores it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: String,
    pub address: Option<Address>,
    pub fair_launch_id: Option<u64>,
    pub metadata: Option<TokenMetadata>,
    pub image: Option<TokenImage>,
    /// Backend id of the creator
    pub user_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub claimed: Option<bool>,
}

impl TokenRecord {
    /// Best display name available: metadata name, else a shortened
    /// address, else the backend id.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.metadata.as_ref().and_then(|m| m.name.clone()) {
            if !name.is_empty() {
                return name;
            }
        }
        match self.address {
            Some(address) => short_address(address),
            None => self.id.clone(),
        }
    }

    /// Image reference, preferring launch metadata over the upload record.
    pub fn image_key(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.image_key.as_deref())
            .or_else(|| self.image.as_ref().and_then(|i| i.s3_key.as_deref()))
    }
}

/// `0xAbCd...1234` shortened for labels.
pub fn short_address(address: Address) -> String {
    let hex = format!("{:#x}", address);
    format!("{}...{}", &hex[..6], &hex[hex.len() - 4..])
}

/// One server-paginated page of the token list, trusted as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPage {
    pub tokens: Vec<TokenRecord>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
    token_cache: Cache<Address, Arc<TokenRecord>>,
}

impl BackendClient {
    pub fn new(base_url: String, token_cache_ttl: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        let token_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(token_cache_ttl)
            .build();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            token_cache,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(2))
            .take(3);

        Retry::spawn(retry_strategy, || async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .with_context(|| format!("GET {} failed", url))?;

            if response.status() == StatusCode::NOT_FOUND {
                return Err(anyhow!("not found: {}", url));
            }
            if !response.status().is_success() {
                return Err(anyhow!("GET {} returned {}", url, response.status()));
            }

            response
                .json::<T>()
                .await
                .with_context(|| format!("decoding response of {}", url))
        })
        .await
    }

    /// Token metadata by on-chain address, served from cache while fresh.
    #[instrument(skip(self))]
    pub async fn token_by_address(&self, address: Address) -> Result<Arc<TokenRecord>> {
        if let Some(cached) = self.token_cache.get(&address).await {
            debug!("token {} served from cache", address);
            return Ok(cached);
        }

        let record: TokenRecord = self
            .get_json(&format!("/api/token-by-address/{:#x}", address))
            .await?;
        let record = Arc::new(record);
        self.token_cache.insert(address, record.clone()).await;
        Ok(record)
    }

    /// Server-paginated token list. Filtering and ordering happen on the
    /// backend; the page comes back ready to render.
    #[instrument(skip(self))]
    pub async fn tokens(&self, page: u32, limit: u32, sort: Option<&str>) -> Result<TokenPage> {
        let mut path = format!("/api/tokens?page={}&limit={}", page, limit);
        if let Some(sort) = sort {
            path.push_str(&format!("&sort={}", sort));
        }
        self.get_json(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_address() {
        let address = Address::repeat_byte(0xab);
        let label = short_address(address);
        assert_eq!(label, "0xabab...abab");
    }

    #[test]
    fn test_display_name_prefers_metadata() {
        let record = TokenRecord {
            id: "tok_1".to_string(),
            address: Some(Address::repeat_byte(0x11)),
            metadata: Some(TokenMetadata {
                name: Some("DOGE2".to_string()),
                ..TokenMetadata::default()
            }),
            ..TokenRecord::default()
        };
        assert_eq!(record.display_name(), "DOGE2");
    }

    #[test]
    fn test_display_name_falls_back_to_address() {
        let record = TokenRecord {
            id: "tok_1".to_string(),
            address: Some(Address::repeat_byte(0x11)),
            ..TokenRecord::default()
        };
        assert_eq!(record.display_name(), "0x1111...1111");
    }

    #[test]
    fn test_image_key_preference() {
        let record = TokenRecord {
            id: "tok_1".to_string(),
            metadata: Some(TokenMetadata {
                image_key: Some("meta.png".to_string()),
                ..TokenMetadata::default()
            }),
            image: Some(TokenImage { s3_key: Some("upload.png".to_string()) }),
            ..TokenRecord::default()
        };
        assert_eq!(record.image_key(), Some("meta.png"));

        let record = TokenRecord {
            id: "tok_1".to_string(),
            image: Some(TokenImage { s3_key: Some("upload.png".to_string()) }),
            ..TokenRecord::default()
        };
        assert_eq!(record.image_key(), Some("upload.png"));
    }

    #[test]
    fn test_token_record_deserializes_backend_shape() {
        let record: TokenRecord = serde_json::from_value(serde_json::json!({
            "id": "tok_42",
            "address": "0x1111111111111111111111111111111111111111",
            "fairLaunchId": 42,
            "metadata": { "name": "PEPE", "ticker": "PEPE", "imageKey": "pepe.png" },
            "userId": "user_7",
            "createdAt": "2025-11-02T10:00:00Z",
            "claimed": false,
        }))
        .unwrap();

        assert_eq!(record.fair_launch_id, Some(42));
        assert_eq!(record.display_name(), "PEPE");
        assert_eq!(record.claimed, Some(false));
    }
}
