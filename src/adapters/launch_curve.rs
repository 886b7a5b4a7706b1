// src/adapters/launch_curve.rs
//
// Adapter for the bonding-curve launch platform (cspr.fun). Authoritative
// for pre-listing tokens: identity, total supply, social links, and the
// curve's reserve snapshot. The platform's catalog is small enough to
// fetch wholesale, so matching happens against a short-TTL snapshot of the
// whole catalog rather than per-token requests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::adapters::flexible_decimal;
use crate::cache::TtlCell;
use crate::errors::AdapterError;
use crate::http;
use crate::identifier::TokenIdentifier;
use crate::settings::Settings;
use crate::source_adapter::{Outcome, SourceAdapter};
use crate::types::{
    LifecycleStage, ReserveSnapshot, SocialLinks, SourceId, TokenContribution,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveToken {
    #[serde(default)]
    pub contract_hash: Option<String>,
    #[serde(default)]
    pub contract_package_hash: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_decimal")]
    pub total_supply: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_decimal")]
    pub cspr_reserve: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_decimal")]
    pub token_reserve: Option<Decimal>,
    #[serde(default)]
    pub is_graduated: bool,
    #[serde(default, deserialize_with = "flexible_decimal")]
    pub tax_percentage: Option<Decimal>,
    /// Milliseconds since epoch.
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub discord: Option<String>,
}

impl CurveToken {
    fn matches(&self, identifier: &TokenIdentifier) -> bool {
        [&self.contract_hash, &self.contract_package_hash]
            .into_iter()
            .flatten()
            .any(|hash| identifier.matches(hash))
    }

    fn socials(&self) -> SocialLinks {
        SocialLinks {
            website: self.website.clone(),
            twitter: self.twitter.clone(),
            telegram: self.telegram.clone(),
            discord: self.discord.clone(),
        }
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.creation_timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

#[derive(Debug, Deserialize)]
struct CurveCatalogResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<CurveToken>,
}

pub struct LaunchCurveAdapter {
    client: Client,
    base_url: String,
    default_decimals: u8,
    max_retries: u32,
    retry_base_delay: Duration,
    catalog: Arc<TtlCell<Vec<CurveToken>>>,
}

impl LaunchCurveAdapter {
    pub fn new(settings: &Settings, client: Client) -> Self {
        Self {
            client,
            base_url: settings.endpoints.launch_curve_base_url.clone(),
            default_decimals: settings.pricing.default_token_decimals,
            max_retries: settings.http.max_retries,
            retry_base_delay: Duration::from_millis(settings.http.retry_base_delay_ms),
            catalog: Arc::new(TtlCell::new(
                "curve_catalog",
                Duration::from_secs(settings.cache.curve_catalog_ttl_seconds),
            )),
        }
    }

    /// The whole launch catalog, served from the short-TTL tier.
    pub async fn catalog(&self) -> Vec<CurveToken> {
        self.catalog
            .get_or_refresh(|| self.fetch_catalog())
            .await
            .unwrap_or_default()
    }

    async fn fetch_catalog(&self) -> Result<Vec<CurveToken>, AdapterError> {
        let url = format!(
            "{}/tokens/featured?sortBy=vol&sortDir=desc&limit=100&skip=0",
            self.base_url
        );
        let response: CurveCatalogResponse = http::get_json(
            &self.client,
            &url,
            &[],
            self.max_retries,
            self.retry_base_delay,
        )
        .await?;

        if !response.success {
            return Err(AdapterError::Malformed(
                "launch catalog response flagged unsuccessful".into(),
            ));
        }
        debug!("launch catalog refreshed: {} tokens", response.data.len());
        Ok(response.data)
    }

    fn contribution(&self, token: &CurveToken) -> TokenContribution {
        let snapshot = match (token.token_reserve, token.cspr_reserve) {
            (Some(base), Some(quote)) => Some(ReserveSnapshot {
                base_reserve: base,
                quote_reserve: quote,
                decimals: self.default_decimals,
                stage: LifecycleStage::PreListing,
                source: SourceId::LaunchCurve,
                observed_at: Utc::now(),
            }),
            _ => None,
        };

        let socials = token.socials();
        TokenContribution {
            name: token.name.clone(),
            symbol: token.symbol.clone(),
            logo_url: token.logo.clone(),
            description: token.description.clone(),
            decimals: Some(self.default_decimals),
            total_supply: token.total_supply,
            tax_percentage: token.tax_percentage,
            created_at: token.created_at(),
            socials: (!socials.is_empty()).then_some(socials),
            snapshot,
            graduated_hint: token.is_graduated,
            ..TokenContribution::new(SourceId::LaunchCurve)
        }
    }
}

#[async_trait]
impl SourceAdapter for LaunchCurveAdapter {
    fn source(&self) -> SourceId {
        SourceId::LaunchCurve
    }

    async fn resolve(&self, identifier: &TokenIdentifier) -> Outcome {
        let catalog = self.catalog().await;
        if catalog.is_empty() {
            warn!("launch catalog unavailable or empty");
            return Outcome::NotFound;
        }

        match catalog.iter().find(|token| token.matches(identifier)) {
            Some(token) => Outcome::Found(self.contribution(token)),
            None => Outcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "40bd4a45c414df61be3832e28ff6dcedc479744707c611fd97fea0d90619146f";

    fn curve_token() -> CurveToken {
        serde_json::from_str(&format!(
            r#"{{
                "contractHash": "hash-{HASH}",
                "contractPackageHash": "{HASH}",
                "name": "Moon",
                "symbol": "MOON",
                "totalSupply": "1000000000000000",
                "csprReserve": "50000000000",
                "tokenReserve": "500000000000000",
                "isGraduated": false
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_matches_any_hash_variant() {
        let token = curve_token();
        assert!(token.matches(&TokenIdentifier::new(HASH)));
        assert!(token.matches(&TokenIdentifier::new(&format!("contract-package-{}", HASH))));
        // Truncated identifier via the prefix-overlap rule
        assert!(token.matches(&TokenIdentifier::new(&HASH[..20])));
        assert!(!token.matches(&TokenIdentifier::new("deadbeefdeadbeefdead")));
    }

    #[test]
    fn test_contribution_carries_pre_listing_snapshot() {
        let adapter = LaunchCurveAdapter::new(&Settings::default(), http::DEFAULT_CLIENT.clone());
        let contribution = adapter.contribution(&curve_token());

        let snapshot = contribution.snapshot.expect("reserve snapshot");
        assert_eq!(snapshot.stage, LifecycleStage::PreListing);
        assert_eq!(snapshot.quote_reserve, Decimal::from(50_000_000_000u64));
        assert_eq!(snapshot.base_reserve, Decimal::from(500_000_000_000_000u64));
        assert!(!contribution.graduated_hint);
        assert_eq!(contribution.name.as_deref(), Some("Moon"));
    }

    #[test]
    fn test_graduated_flag_becomes_hint() {
        let adapter = LaunchCurveAdapter::new(&Settings::default(), http::DEFAULT_CLIENT.clone());
        let mut token = curve_token();
        token.is_graduated = true;
        assert!(adapter.contribution(&token).graduated_hint);
    }
}
