// src/adapters/dex_pair.rs
//
// Adapter for the AMM pair endpoint (Friendly.Market). Authoritative for
// listed tokens: reserve0 is the token side, reserve1 the wrapped-native
// side. A pair that exists with empty reserves is not a meaningful listing
// and resolves as NotFound; the endpoint also answers with a bare swap
// quote for unknown pairs, which carries no pair data and is rejected.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::adapters::{flexible_decimal, flexible_u64};
use crate::http;
use crate::identifier::TokenIdentifier;
use crate::settings::Settings;
use crate::source_adapter::{Outcome, SourceAdapter};
use crate::types::{LifecycleStage, ReserveSnapshot, SourceId, TokenContribution};

#[derive(Debug, Deserialize)]
struct PairResponse {
    #[serde(default)]
    data: Option<PairData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairData {
    #[serde(default, deserialize_with = "flexible_decimal")]
    reserve0: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_decimal")]
    reserve1: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_u64")]
    tx_count: Option<u64>,
    #[serde(default, deserialize_with = "flexible_u64")]
    liquidity_provider_count: Option<u64>,
    #[serde(default)]
    token0_model: Option<TokenModel>,
    /// Present when the endpoint answered with a swap quote instead of
    /// pair data.
    #[serde(default, deserialize_with = "flexible_decimal")]
    amount_out: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default, deserialize_with = "flexible_u64")]
    decimals: Option<u64>,
    #[serde(default, deserialize_with = "flexible_decimal")]
    total_supply: Option<Decimal>,
    #[serde(default, rename = "dailyVolumeUSD", deserialize_with = "flexible_decimal")]
    daily_volume_usd: Option<Decimal>,
}

pub struct DexPairAdapter {
    client: Client,
    base_url: String,
    native_pair_hash: String,
    default_decimals: u8,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl DexPairAdapter {
    pub fn new(settings: &Settings, client: Client) -> Self {
        Self {
            client,
            base_url: settings.endpoints.dex_base_url.clone(),
            native_pair_hash: settings.endpoints.native_pair_hash.clone(),
            default_decimals: settings.pricing.default_token_decimals,
            max_retries: settings.http.max_retries,
            retry_base_delay: Duration::from_millis(settings.http.retry_base_delay_ms),
        }
    }

    fn contribution(&self, pair: PairData) -> Option<TokenContribution> {
        // Swap quote, not a pair.
        if pair.amount_out.is_some() && pair.token0_model.is_none() {
            return None;
        }

        let base = pair.reserve0.unwrap_or(Decimal::ZERO);
        let quote = pair.reserve1.unwrap_or(Decimal::ZERO);
        if base <= Decimal::ZERO || quote <= Decimal::ZERO {
            debug!("pair has empty reserves, not a listing");
            return None;
        }

        let token = pair.token0_model.unwrap_or_default();
        let decimals = token
            .decimals
            .and_then(|d| u8::try_from(d).ok())
            .unwrap_or(self.default_decimals);

        Some(TokenContribution {
            name: token.name,
            symbol: token.symbol,
            decimals: Some(decimals),
            total_supply: token.total_supply,
            tx_count: pair.tx_count,
            liquidity_provider_count: pair.liquidity_provider_count,
            volume_usd: token.daily_volume_usd,
            snapshot: Some(ReserveSnapshot {
                base_reserve: base,
                quote_reserve: quote,
                decimals,
                stage: LifecycleStage::Listed,
                source: SourceId::DexPair,
                observed_at: Utc::now(),
            }),
            ..TokenContribution::new(SourceId::DexPair)
        })
    }
}

#[async_trait]
impl SourceAdapter for DexPairAdapter {
    fn source(&self) -> SourceId {
        SourceId::DexPair
    }

    async fn resolve(&self, identifier: &TokenIdentifier) -> Outcome {
        if !identifier.is_hash_like() {
            return Outcome::NotFound;
        }

        let url = format!(
            "{}/pair/{}/{}/0/0",
            self.base_url,
            self.native_pair_hash,
            identifier.canonical()
        );
        let headers = [("Accept", "application/json".to_string())];

        let response: PairResponse = match http::get_json(
            &self.client,
            &url,
            &headers,
            self.max_retries,
            self.retry_base_delay,
        )
        .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("pair fetch failed for {}: {}", identifier, e);
                return Outcome::NotFound;
            }
        };

        match response.data.and_then(|pair| self.contribution(pair)) {
            Some(contribution) => Outcome::Found(contribution),
            None => Outcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> DexPairAdapter {
        DexPairAdapter::new(&Settings::default(), http::DEFAULT_CLIENT.clone())
    }

    #[test]
    fn test_listed_pair_becomes_contribution() {
        let pair: PairData = serde_json::from_str(
            r#"{
                "reserve0": "2000000",
                "reserve1": "1200",
                "txCount": "314",
                "liquidityProviderCount": 12,
                "token0Model": {
                    "name": "Moon",
                    "symbol": "MOON",
                    "decimals": "9",
                    "totalSupply": "1000000000000000",
                    "dailyVolumeUSD": "321.5"
                }
            }"#,
        )
        .unwrap();

        let contribution = adapter().contribution(pair).expect("contribution");
        let snapshot = contribution.snapshot.expect("snapshot");
        assert_eq!(snapshot.stage, LifecycleStage::Listed);
        assert_eq!(snapshot.base_reserve, Decimal::from(2_000_000));
        assert_eq!(snapshot.quote_reserve, Decimal::from(1200));
        assert_eq!(contribution.tx_count, Some(314));
        assert_eq!(contribution.liquidity_provider_count, Some(12));
        assert_eq!(contribution.volume_usd, Some(Decimal::new(3215, 1)));
    }

    #[test]
    fn test_zero_reserves_are_not_a_listing() {
        let pair: PairData =
            serde_json::from_str(r#"{"reserve0": "0", "reserve1": "0"}"#).unwrap();
        assert!(adapter().contribution(pair).is_none());
    }

    #[test]
    fn test_swap_quote_is_rejected() {
        let pair: PairData = serde_json::from_str(r#"{"amountOut": "123"}"#).unwrap();
        assert!(adapter().contribution(pair).is_none());
    }
}
