// src/native_price.rs
//
// CSPR/USD exchange rate used to convert native-denominated figures into
// the display currency. Primary source CoinGecko, fallback CryptoCompare,
// final fallback a configured constant. The rate is cached briefly; market
// figures tolerate a slightly stale rate, upstream rate limits do not
// tolerate a request per resolution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::AdapterError;
use crate::http;

const COINGECKO_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=casper-network&vs_currencies=usd";
const COINGECKO_ID: &str = "casper-network";
const CRYPTOCOMPARE_URL: &str =
    "https://min-api.cryptocompare.com/data/price?fsym=CSPR&tsyms=USD";

#[derive(Debug, Deserialize)]
struct CoinGeckoQuote {
    usd: f64,
}

#[derive(Debug, Deserialize)]
struct CryptoCompareQuote {
    #[serde(rename = "USD")]
    usd: f64,
}

struct RateEntry {
    rate: Decimal,
    fetched_at: Instant,
}

pub struct NativeRateFeed {
    client: Client,
    fallback: Decimal,
    ttl: Duration,
    cached: ArcSwapOption<RateEntry>,
}

impl NativeRateFeed {
    pub fn new(client: Client, fallback: Decimal, ttl: Duration) -> Self {
        Self {
            client,
            fallback,
            ttl,
            cached: ArcSwapOption::new(None),
        }
    }

    /// A feed pinned to a fixed rate, never hitting the network. For
    /// tests and embedders that supply their own rate.
    pub fn fixed(rate: Decimal) -> Self {
        let feed = Self::new(
            http::DEFAULT_CLIENT.clone(),
            rate,
            Duration::from_secs(u32::MAX as u64),
        );
        feed.cached.store(Some(Arc::new(RateEntry {
            rate,
            fetched_at: Instant::now(),
        })));
        feed
    }

    /// Current CSPR/USD rate. Never fails: falls through CoinGecko, then
    /// CryptoCompare, then the configured constant.
    pub async fn usd_rate(&self) -> Decimal {
        if let Some(entry) = self.cached.load_full() {
            if entry.fetched_at.elapsed() < self.ttl {
                return entry.rate;
            }
        }

        match self.fetch().await {
            Ok(rate) => {
                self.cached.store(Some(Arc::new(RateEntry {
                    rate,
                    fetched_at: Instant::now(),
                })));
                rate
            }
            Err(e) => {
                warn!("native rate fetch failed, using fallback: {}", e);
                // A stale quote still beats the static fallback.
                self.cached
                    .load_full()
                    .map(|entry| entry.rate)
                    .unwrap_or(self.fallback)
            }
        }
    }

    async fn fetch(&self) -> Result<Decimal, AdapterError> {
        match self.fetch_coingecko().await {
            Ok(rate) => return Ok(rate),
            Err(e) => debug!("CoinGecko rate fetch failed: {}", e),
        }
        self.fetch_cryptocompare().await
    }

    async fn fetch_coingecko(&self) -> Result<Decimal, AdapterError> {
        let quotes: HashMap<String, CoinGeckoQuote> = http::get_json(
            &self.client,
            COINGECKO_URL,
            &[],
            0,
            Duration::from_millis(0),
        )
        .await?;
        let quote = quotes
            .get(COINGECKO_ID)
            .ok_or_else(|| AdapterError::Malformed("missing casper-network quote".into()))?;
        validate_rate(quote.usd)
    }

    async fn fetch_cryptocompare(&self) -> Result<Decimal, AdapterError> {
        let quote: CryptoCompareQuote = http::get_json(
            &self.client,
            CRYPTOCOMPARE_URL,
            &[],
            0,
            Duration::from_millis(0),
        )
        .await?;
        validate_rate(quote.usd)
    }
}

/// Reject zero, negative, and absurd quotes before they poison every
/// derived market figure.
fn validate_rate(raw: f64) -> Result<Decimal, AdapterError> {
    if !(raw > 0.0 && raw < 100.0) {
        return Err(AdapterError::Malformed(format!(
            "implausible CSPR/USD rate {}",
            raw
        )));
    }
    Decimal::from_f64(raw)
        .ok_or_else(|| AdapterError::Malformed(format!("unrepresentable rate {}", raw)))
}
