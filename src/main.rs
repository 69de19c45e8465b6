//! memed-pulse daemon: keeps live snapshots of platform state and logs
//! transitions as they land.

use anyhow::Result;
use memed_pulse::aggregator::{BatchAggregator, TokensBatchData};
use memed_pulse::api::BackendClient;
use memed_pulse::battles::{BattleFeed, BattleFeedSnapshot};
use memed_pulse::chain::{ChainClient, RpcChainClient};
use memed_pulse::config::PulseConfig;
use memed_pulse::contracts::{BattleClient, FactoryClient, SaleClient};
use memed_pulse::history;
use memed_pulse::oracle::{EthUsdFeed, HttpFallbackSource};
use memed_pulse::poller::spawn_poller;
use memed_pulse::pricing;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let config = PulseConfig::from_env();
    info!(
        "starting memed-pulse against {} RPC endpoint(s)",
        config.rpc_endpoints.len()
    );

    let chain: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(&config)?);
    let backend = Arc::new(BackendClient::new(
        config.api_base_url.clone(),
        Duration::from_secs(config.token_cache_ttl_secs),
    )?);

    let factory = Arc::new(FactoryClient::new(
        Arc::clone(&chain),
        config.contracts.factory,
    ));
    let sale = Arc::new(SaleClient::new(
        Arc::clone(&chain),
        config.contracts.token_sale,
    ));
    let battle = Arc::new(BattleClient::new(
        Arc::clone(&chain),
        config.contracts.battle,
    ));
    let aggregator = Arc::new(BatchAggregator::new(factory, sale, config.max_batch_tokens));
    let battle_feed = Arc::new(BattleFeed::new(battle, Arc::clone(&backend)));

    let price_feed = Arc::new(EthUsdFeed::new(
        Arc::clone(&chain),
        config.contracts.chainlink_eth_usd,
        Arc::new(HttpFallbackSource::new(
            reqwest::Client::new(),
            config.fallback_price_url.clone(),
        )),
    ));

    // First backend page seeds the id set the aggregator tracks
    let first_page = backend.tokens(0, config.max_batch_tokens as u32, None).await;
    let launch_ids: Vec<_> = match &first_page {
        Ok(page) => page.tokens.iter().map(|t| t.fair_launch_id).collect(),
        Err(err) => {
            warn!("backend token list unavailable, starting empty: {:#}", err);
            Vec::new()
        }
    };
    let featured_token = first_page
        .ok()
        .and_then(|page| page.tokens.into_iter().find_map(|t| t.address));

    let status_interval = Duration::from_secs(config.status_poll_secs);
    let history_interval = Duration::from_secs(config.history_poll_secs);

    // Token batch snapshot
    let batch_poller = spawn_poller("token-batch", status_interval, {
        let aggregator = Arc::clone(&aggregator);
        let launch_ids = launch_ids.clone();
        move || {
            let aggregator = Arc::clone(&aggregator);
            let launch_ids = launch_ids.clone();
            async move { Ok(aggregator.fetch(&launch_ids).await) }
        }
    });

    // ETH/USD price snapshot
    let price_poller = spawn_poller("eth-usd", history_interval, {
        let price_feed = Arc::clone(&price_feed);
        move || {
            let price_feed = Arc::clone(&price_feed);
            async move { price_feed.latest().await.map(Some) }
        }
    });

    // Creator incentive activity
    let activity_poller = spawn_poller("creator-activity", history_interval, {
        let chain = Arc::clone(&chain);
        let engage = config.contracts.engage_to_earn;
        let max_blocks_back = config.max_blocks_back;
        move || {
            let chain = Arc::clone(&chain);
            async move {
                history::creator_activity(&chain, engage, max_blocks_back).await
            }
        }
    });

    // Active battles of the first listed token, when there is one
    let battle_poller = featured_token.map(|token| {
        spawn_poller("active-battles", status_interval, {
            let battle_feed = Arc::clone(&battle_feed);
            move || {
                let battle_feed = Arc::clone(&battle_feed);
                async move { battle_feed.active_battles_for(token).await }
            }
        })
    });

    // Log snapshot transitions until shutdown
    let mut batch_rx = batch_poller.subscribe();
    let mut price_rx = price_poller.subscribe();
    let mut activity_rx = activity_poller.subscribe();
    let mut battles_rx = battle_poller.as_ref().map(|poller| poller.subscribe());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            changed = batch_rx.changed() => {
                if changed.is_err() { break; }
                let snapshot = batch_rx.borrow().clone();
                log_batch(&snapshot.value, snapshot.has_error());
            }
            changed = price_rx.changed() => {
                if changed.is_err() { break; }
                let snapshot = price_rx.borrow().clone();
                if let Some(quote) = snapshot.value {
                    info!(
                        "ETH/USD {} ({:?}{})",
                        pricing::format_usd(
                            u128::try_from(quote.price).unwrap_or(0) as f64 / 1e8
                        ),
                        quote.source,
                        if quote.is_stale { ", stale" } else { "" },
                    );
                }
            }
            changed = activity_rx.changed() => {
                if changed.is_err() { break; }
                let snapshot = activity_rx.borrow().clone();
                info!("creator activity: {} recent events", snapshot.value.len());
            }
            changed = async { battles_rx.as_mut().unwrap().changed().await },
                if battles_rx.is_some() =>
            {
                if changed.is_err() { break; }
                let snapshot = battles_rx.as_ref().unwrap().borrow().clone();
                log_battles(&snapshot.value);
            }
        }
    }

    Ok(())
}

fn log_batch(batch: &TokensBatchData, errored: bool) {
    let failed = batch.data.values().filter(|entry| entry.is_failed).count();
    let unclaimed = batch.data.values().filter(|entry| entry.is_unclaimed).count();
    info!(
        "token batch: {} tracked, {} failed launches, {} unclaimed{}",
        batch.data.len(),
        failed,
        unclaimed,
        if errored { " (cycle error)" } else { "" },
    );
}

fn log_battles(snapshot: &BattleFeedSnapshot) {
    for battle in &snapshot.battles {
        let name = |address| {
            snapshot
                .details
                .get(&address)
                .map(|details| details.name.clone())
                .unwrap_or_default()
        };
        info!(
            "battle {}: {} vs {}",
            battle.battle_id,
            name(battle.meme_a),
            name(battle.meme_b),
        );
    }
}
