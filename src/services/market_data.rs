// src/services/market_data.rs
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::models::{AssetClass, AssetRates};
use crate::services::cache::TtlCache;
use crate::services::sources::{http_client, CoinDesk, CoinGecko, FallbackChain, TreasuryYield};
use crate::BoxError;

pub const MARKET_CACHE_KEY: &str = "market-current";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Fallback,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetQuote {
    pub rate: f64,
    pub status: SourceStatus,
    pub label: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl AssetQuote {
    fn historical(asset: AssetClass) -> Self {
        let label = match asset {
            AssetClass::Bank => "High-yield savings average",
            AssetClass::Bonds => "10-year Treasury bond yield",
            AssetClass::Stocks => "Historical S&P 500 average",
            AssetClass::Gold => "Historical precious metals average",
            AssetClass::Crypto => "Highly volatile - 15% average but risky",
            AssetClass::Diversified => "Balanced portfolio average",
        };
        AssetQuote {
            rate: asset.historical_return(),
            status: SourceStatus::Fallback,
            label: label.to_string(),
            source: "Historical average".to_string(),
            price: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub assets: BTreeMap<AssetClass, AssetQuote>,
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Every asset at its built-in rate, nothing fetched.
    pub fn historical() -> Self {
        MarketSnapshot {
            assets: AssetClass::ALL
                .iter()
                .map(|&asset| (asset, AssetQuote::historical(asset)))
                .collect(),
            fetched_at: Utc::now(),
        }
    }

    pub fn rates(&self) -> AssetRates {
        let mut rates = AssetRates::historical();
        for (&asset, quote) in &self.assets {
            rates.set(asset, quote.rate);
        }
        rates
    }

    pub fn api_status(&self) -> BTreeMap<AssetClass, SourceStatus> {
        self.assets
            .iter()
            .map(|(&asset, quote)| (asset, quote.status))
            .collect()
    }

    pub fn status_of(&self, asset: AssetClass) -> Option<SourceStatus> {
        self.assets.get(&asset).map(|quote| quote.status)
    }
}

#[derive(Debug, Clone)]
pub struct MarketData {
    pub snapshot: Arc<MarketSnapshot>,
    pub cached: bool,
}

/// Assembles the six-asset market snapshot from live sources and the
/// built-in table, behind a short-lived cache.
pub struct MarketDataGateway {
    cache: TtlCache<MarketSnapshot>,
    crypto: FallbackChain,
    treasury: FallbackChain,
}

impl MarketDataGateway {
    pub fn new(cache: TtlCache<MarketSnapshot>, crypto: FallbackChain, treasury: FallbackChain) -> Self {
        MarketDataGateway {
            cache,
            crypto,
            treasury,
        }
    }

    /// Gateway wired to the live Bitcoin and Treasury sources.
    pub fn from_config(config: &Config) -> Result<Self, BoxError> {
        let client = http_client()?;

        let crypto = FallbackChain::new("bitcoin", config.source_timeout, config.source_backoff)
            .with_source(CoinGecko::new(client.clone()))
            .with_source(CoinDesk::new(client.clone()));
        let treasury = FallbackChain::new("treasury", config.source_timeout, config.source_backoff)
            .with_source(TreasuryYield::new(client));

        Ok(Self::new(TtlCache::new(config.market_cache_ttl), crypto, treasury))
    }

    /// Longest a single uncached request can take.
    pub fn worst_case_latency(&self) -> Duration {
        self.crypto.worst_case() + self.treasury.worst_case()
    }

    pub async fn current(&self, force_refresh: bool) -> MarketData {
        if force_refresh {
            info!("Force refresh requested - bypassing market cache");
        }

        let (snapshot, cached) = self
            .cache
            .get_or_fetch(MARKET_CACHE_KEY, force_refresh, || self.fetch_snapshot())
            .await;

        if cached {
            info!("Returning cached market data from {}", snapshot.fetched_at);
        }
        MarketData { snapshot, cached }
    }

    async fn fetch_snapshot(&self) -> MarketSnapshot {
        info!("Fetching live market data");
        let mut snapshot = MarketSnapshot::historical();

        // One upstream at a time: the treasury chain starts after the bitcoin chain finishes.
        let bitcoin = self.crypto.resolve().await;
        if let Some(quote) = snapshot.assets.get_mut(&AssetClass::Crypto) {
            match bitcoin {
                Some(resolved) => {
                    quote.status = SourceStatus::Success;
                    quote.price = Some(resolved.value);
                    quote.source = resolved.source;
                }
                None => {
                    warn!("Bitcoin price unavailable, serving fallback crypto entry");
                    quote.status = SourceStatus::Error;
                    quote.label = "Data unavailable".to_string();
                    quote.source = "Fallback data".to_string();
                }
            }
        }

        let treasury = self.treasury.resolve().await;
        if let Some(quote) = snapshot.assets.get_mut(&AssetClass::Bonds) {
            match treasury {
                Some(resolved) => {
                    quote.status = SourceStatus::Success;
                    quote.rate = resolved.value;
                    quote.source = resolved.source;
                }
                None => {
                    warn!("Treasury yield unavailable, using {}", quote.rate);
                    quote.source = "Fallback data".to_string();
                }
            }
        }

        snapshot.fetched_at = Utc::now();
        info!("Market snapshot assembled: {:?}", snapshot.api_status());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sources::QuoteSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(&'static str, f64);

    #[async_trait]
    impl QuoteSource for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch(&self) -> Result<f64, BoxError> {
            Ok(self.1)
        }
    }

    struct Down(Arc<AtomicUsize>);

    #[async_trait]
    impl QuoteSource for Down {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch(&self) -> Result<f64, BoxError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err("503 Service Unavailable".into())
        }
    }

    fn chain(label: &str) -> FallbackChain {
        FallbackChain::new(label, Duration::from_secs(5), Duration::from_secs(1))
    }

    fn gateway(crypto: FallbackChain, treasury: FallbackChain) -> MarketDataGateway {
        MarketDataGateway::new(TtlCache::new(Duration::from_secs(900)), crypto, treasury)
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_sources_down_still_complete() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gw = gateway(
            chain("bitcoin").with_source(Down(calls.clone())).with_source(Down(calls.clone())),
            chain("treasury").with_source(Down(calls.clone())),
        );

        let data = gw.current(false).await;
        let snapshot = &data.snapshot;
        assert!(!data.cached);
        assert_eq!(snapshot.assets.len(), 6);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let crypto = &snapshot.assets[&AssetClass::Crypto];
        assert_eq!(crypto.status, SourceStatus::Error);
        assert_eq!(crypto.rate, 0.15);
        assert_eq!(crypto.label, "Data unavailable");
        assert!(crypto.price.is_none());

        let bonds = &snapshot.assets[&AssetClass::Bonds];
        assert_eq!(bonds.status, SourceStatus::Fallback);
        assert_eq!(bonds.rate, 0.042);
    }

    #[tokio::test]
    async fn test_live_values_applied() {
        let gw = gateway(
            chain("bitcoin").with_source(Fixed("CoinGecko API", 67_000.0)),
            chain("treasury").with_source(Fixed("treasury", 0.0415)),
        );

        let snapshot = gw.current(false).await.snapshot;
        assert_eq!(snapshot.status_of(AssetClass::Crypto), Some(SourceStatus::Success));
        assert_eq!(snapshot.assets[&AssetClass::Crypto].price, Some(67_000.0));
        assert_eq!(snapshot.assets[&AssetClass::Crypto].source, "CoinGecko API");
        assert_eq!(snapshot.rates().get(AssetClass::Bonds), 0.0415);
        assert_eq!(snapshot.rates().get(AssetClass::Crypto), 0.15);
        assert_eq!(snapshot.status_of(AssetClass::Stocks), Some(SourceStatus::Fallback));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_and_force_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gw = gateway(
            chain("bitcoin").with_source(Down(calls.clone())),
            chain("treasury").with_source(Fixed("treasury", 0.04)),
        );

        assert!(!gw.current(false).await.cached);
        assert!(gw.current(false).await.cached);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(!gw.current(true).await.cached);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(901)).await;
        assert!(!gw.current(false).await.cached);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_worst_case_latency() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gw = gateway(
            chain("bitcoin").with_source(Down(calls.clone())).with_source(Down(calls.clone())),
            chain("treasury").with_source(Down(calls)),
        );
        assert_eq!(gw.worst_case_latency(), Duration::from_secs(16));
    }

    #[test]
    fn test_snapshot_serializes_keyed_by_asset() {
        let json = serde_json::to_value(MarketSnapshot::historical()).unwrap();
        assert_eq!(json["assets"]["gold"]["rate"], 0.03);
        assert_eq!(json["assets"]["crypto"]["status"], "fallback");
        assert!(json["assets"]["crypto"].get("price").is_none());
        assert!(json["fetchedAt"].is_string());
    }
}
