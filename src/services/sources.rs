// src/services/sources.rs
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use csv::Reader;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::BoxError;

const COINGECKO_URL: &str = "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";
const COINDESK_URL: &str = "https://api.coindesk.com/v1/bpi/currentprice.json";

/// A single upstream that can produce one number (a price or a yield).
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<f64, BoxError>;
}

pub fn http_client() -> Result<Client, BoxError> {
    let client = Client::builder()
        .user_agent("Mozilla/5.0 (compatible; nest-value/0.1)")
        .build()?;
    Ok(client)
}

#[derive(Deserialize)]
struct CoinGeckoResponse {
    bitcoin: CoinGeckoQuote,
}

#[derive(Deserialize)]
struct CoinGeckoQuote {
    usd: f64,
}

/// Bitcoin spot price in USD from CoinGecko's simple price endpoint.
pub struct CoinGecko {
    client: Client,
    url: String,
}

impl CoinGecko {
    pub fn new(client: Client) -> Self {
        CoinGecko {
            client,
            url: COINGECKO_URL.to_string(),
        }
    }
}

#[async_trait]
impl QuoteSource for CoinGecko {
    fn name(&self) -> &str {
        "CoinGecko API"
    }

    async fn fetch(&self) -> Result<f64, BoxError> {
        let response: CoinGeckoResponse = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.bitcoin.usd)
    }
}

#[derive(Deserialize)]
struct CoinDeskResponse {
    bpi: CoinDeskIndex,
}

#[derive(Deserialize)]
struct CoinDeskIndex {
    #[serde(rename = "USD")]
    usd: CoinDeskRate,
}

#[derive(Deserialize)]
struct CoinDeskRate {
    rate_float: f64,
}

/// Bitcoin price index from CoinDesk, used when CoinGecko is unavailable.
pub struct CoinDesk {
    client: Client,
    url: String,
}

impl CoinDesk {
    pub fn new(client: Client) -> Self {
        CoinDesk {
            client,
            url: COINDESK_URL.to_string(),
        }
    }
}

#[async_trait]
impl QuoteSource for CoinDesk {
    fn name(&self) -> &str {
        "CoinDesk API"
    }

    async fn fetch(&self) -> Result<f64, BoxError> {
        let response: CoinDeskResponse = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.bpi.usd.rate_float)
    }
}

/// 10-year nominal yield from the U.S. Treasury daily par yield curve CSV,
/// returned as a decimal fraction.
pub struct TreasuryYield {
    client: Client,
}

impl TreasuryYield {
    pub fn new(client: Client) -> Self {
        TreasuryYield { client }
    }

    fn url(year: i32) -> String {
        format!(
            "https://home.treasury.gov/resource-center/data-chart-center/interest-rates/\
daily-treasury-rates.csv/{year}/all?type=daily_treasury_yield_curve\
&field_tdr_date_value={year}&_format=csv",
            year = year
        )
    }
}

#[async_trait]
impl QuoteSource for TreasuryYield {
    fn name(&self) -> &str {
        "U.S. Treasury par yield curve"
    }

    async fn fetch(&self) -> Result<f64, BoxError> {
        let url = Self::url(Utc::now().year());
        info!("Fetching treasury yield CSV from URL: {}", url);

        let csv_text = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let percent = parse_yield_column(&csv_text, "10 Yr")?;
        Ok(percent / 100.0)
    }
}

/// Reads `column` from the first data row (most recent date) of a Treasury rates CSV.
pub fn parse_yield_column(csv_text: &str, column: &str) -> Result<f64, BoxError> {
    let mut rdr = Reader::from_reader(csv_text.as_bytes());

    let headers = rdr.headers()?.clone();
    let idx = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| format!("No '{}' column in treasury CSV", column))?;

    if let Some(record) = rdr.records().next() {
        let row = record?;
        let cell = row
            .get(idx)
            .ok_or_else(|| format!("Missing '{}' field", column))?
            .trim();
        let rate = cell.parse::<f64>()?;
        info!("Found treasury yield ({}): {}", column, rate);
        return Ok(rate);
    }

    Err("No data rows in treasury CSV".into())
}

/// Value produced by the first source in a chain that answered.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: f64,
    pub source: String,
}

/// Ordered list of sources tried one after another until one succeeds.
///
/// Each attempt is bounded by `timeout`; a `backoff` pause separates attempts.
/// Sources are never queried concurrently.
pub struct FallbackChain {
    label: String,
    sources: Vec<Box<dyn QuoteSource>>,
    timeout: Duration,
    backoff: Duration,
}

impl FallbackChain {
    pub fn new(label: impl Into<String>, timeout: Duration, backoff: Duration) -> Self {
        FallbackChain {
            label: label.into(),
            sources: Vec::new(),
            timeout,
            backoff,
        }
    }

    pub fn with_source(mut self, source: impl QuoteSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Upper bound on how long `resolve` can take.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.sources.len() as u32;
        self.timeout * attempts + self.backoff * attempts.saturating_sub(1)
    }

    pub async fn resolve(&self) -> Option<Resolved> {
        for (attempt, source) in self.sources.iter().enumerate() {
            if attempt > 0 && !self.backoff.is_zero() {
                tokio::time::sleep(self.backoff).await;
            }

            match tokio::time::timeout(self.timeout, source.fetch()).await {
                Ok(Ok(value)) if value.is_finite() => {
                    info!("{}: {} returned {}", self.label, source.name(), value);
                    return Some(Resolved {
                        value,
                        source: source.name().to_string(),
                    });
                }
                Ok(Ok(value)) => {
                    warn!("{}: {} returned a non-finite value {}", self.label, source.name(), value);
                }
                Ok(Err(e)) => {
                    warn!("{}: {} failed: {}", self.label, source.name(), e);
                }
                Err(_) => {
                    warn!("{}: {} timed out after {:?}", self.label, source.name(), self.timeout);
                }
            }
        }

        warn!("{}: all {} sources failed", self.label, self.sources.len());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    struct Fixed(f64);

    #[async_trait]
    impl QuoteSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self) -> Result<f64, BoxError> {
            Ok(self.0)
        }
    }

    struct Failing(Arc<AtomicUsize>);

    #[async_trait]
    impl QuoteSource for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self) -> Result<f64, BoxError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err("connection refused".into())
        }
    }

    struct Hanging;

    #[async_trait]
    impl QuoteSource for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn fetch(&self) -> Result<f64, BoxError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(1.0)
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let chain = FallbackChain::new("test", Duration::from_secs(5), Duration::ZERO)
            .with_source(Fixed(1.0))
            .with_source(Fixed(2.0));
        let resolved = chain.resolve().await.unwrap();
        assert_eq!(resolved.value, 1.0);
        assert_eq!(resolved.source, "fixed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_before_secondary() {
        let failures = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new("test", Duration::from_secs(5), Duration::from_secs(1))
            .with_source(Failing(failures.clone()))
            .with_source(Fixed(3.0));

        let started = Instant::now();
        let resolved = chain.resolve().await.unwrap();
        assert_eq!(resolved.value, 3.0);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_are_bounded() {
        let chain = FallbackChain::new("test", Duration::from_secs(5), Duration::from_secs(1))
            .with_source(Hanging)
            .with_source(Hanging);

        let started = Instant::now();
        assert!(chain.resolve().await.is_none());
        assert!(started.elapsed() <= chain.worst_case());
        assert_eq!(chain.worst_case(), Duration::from_secs(11));
    }

    #[tokio::test]
    async fn test_non_finite_falls_through() {
        let chain = FallbackChain::new("test", Duration::from_secs(5), Duration::ZERO)
            .with_source(Fixed(f64::NAN))
            .with_source(Fixed(4.5));
        assert_eq!(chain.resolve().await.unwrap().value, 4.5);
    }

    #[test]
    fn test_parse_yield_column() {
        let csv = "Date,\"1 Mo\",\"2 Mo\",\"10 Yr\",\"30 Yr\"\n\
                   10/15/2026,4.31,4.29,4.12,4.58\n\
                   10/14/2026,4.30,4.28,4.10,4.55\n";
        assert_eq!(parse_yield_column(csv, "10 Yr").unwrap(), 4.12);
        assert!(parse_yield_column(csv, "20 Yr").is_err());
        assert!(parse_yield_column("Date,10 Yr\n", "10 Yr").is_err());
    }
}
