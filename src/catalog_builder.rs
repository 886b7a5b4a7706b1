// src/catalog_builder.rs
//
// Builds the process-lifetime enriched catalog: pages the ledger's
// contract-package listing, keeps fungible token packages, maps them to
// base records, then enriches them with DEX market data in fixed-size
// batches with an explicit delay between batches (upstream rate limits).
// Individual token failures are skipped, counted, and logged; they never
// abort the build.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::adapters::dex_pair::DexPairAdapter;
use crate::adapters::{flexible_decimal, flexible_u64};
use crate::errors::AdapterError;
use crate::graduation::detect_stage;
use crate::http;
use crate::identifier::TokenIdentifier;
use crate::merge;
use crate::metrics;
use crate::native_price::NativeRateFeed;
use crate::price_engine;
use crate::settings::Settings;
use crate::source_adapter::SourceAdapter;
use crate::types::{LifecycleStage, SourceId, TokenContribution, TokenRecord};

#[derive(Debug, Deserialize)]
struct PackageListResponse {
    #[serde(default)]
    data: Vec<PackageListItem>,
}

#[derive(Debug, Deserialize)]
struct PackageListItem {
    #[serde(default)]
    contract_package_hash: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    contract_name: Option<String>,
    #[serde(default)]
    icon_url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    owner_public_key: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_u64")]
    latest_version_contract_type_id: Option<u64>,
    #[serde(default)]
    metadata: Option<ListingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ListingMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default, deserialize_with = "flexible_u64")]
    decimals: Option<u64>,
    #[serde(default, deserialize_with = "flexible_decimal")]
    total_supply: Option<Decimal>,
}

pub struct CatalogBuilder {
    client: Client,
    base_url: String,
    mirror_base_url: String,
    api_key: Option<String>,
    page_size: u32,
    max_pages: u32,
    fungible_contract_type_id: u64,
    batch_size: usize,
    batch_delay: Duration,
    default_decimals: u8,
    listing_threshold: Decimal,
    max_retries: u32,
    retry_base_delay: Duration,
    dex: Arc<DexPairAdapter>,
    rate_feed: Arc<NativeRateFeed>,
}

impl CatalogBuilder {
    pub fn new(
        settings: &Settings,
        client: Client,
        dex: Arc<DexPairAdapter>,
        rate_feed: Arc<NativeRateFeed>,
    ) -> Self {
        Self {
            client,
            base_url: settings.endpoints.ledger_base_url.clone(),
            mirror_base_url: settings.endpoints.ledger_mirror_base_url.clone(),
            api_key: settings.endpoints.ledger_api_key.clone(),
            page_size: settings.enrichment.page_size,
            max_pages: settings.enrichment.max_pages,
            fungible_contract_type_id: settings.enrichment.fungible_contract_type_id as u64,
            batch_size: settings.enrichment.batch_size.max(1),
            batch_delay: Duration::from_millis(settings.enrichment.batch_delay_ms),
            default_decimals: settings.pricing.default_token_decimals,
            listing_threshold: settings.pricing.listing_threshold_native,
            max_retries: settings.http.max_retries,
            retry_base_delay: Duration::from_millis(settings.http.retry_base_delay_ms),
            dex,
            rate_feed,
        }
    }

    /// Fetch, filter, map, and enrich the full token catalog.
    pub async fn build(&self) -> Result<Vec<TokenRecord>> {
        let items = self.fetch_all_packages().await?;
        let total_fetched = items.len();

        let mut records: Vec<TokenRecord> = items
            .into_iter()
            .filter(|item| {
                item.latest_version_contract_type_id == Some(self.fungible_contract_type_id)
            })
            .filter_map(|item| self.base_record(item))
            .collect();
        info!(
            "catalog: {} fungible tokens of {} packages fetched",
            records.len(),
            total_fetched
        );

        self.enrich(&mut records).await;
        Ok(records)
    }

    async fn fetch_page(&self, page: u32) -> Result<PackageListResponse, AdapterError> {
        let path = format!(
            "/contract-packages?page={}&page_size={}&contract_type_id={}",
            page, self.page_size, self.fungible_contract_type_id
        );
        self.get_with_mirror(&path).await
    }

    async fn get_with_mirror<T: DeserializeOwned>(&self, path: &str) -> Result<T, AdapterError> {
        let headers: Vec<(&'static str, String)> = self
            .api_key
            .as_ref()
            .map(|key| vec![("Authorization", key.clone())])
            .unwrap_or_default();

        let primary = format!("{}{}", self.base_url, path);
        match http::get_json::<T>(
            &self.client,
            &primary,
            &headers,
            self.max_retries,
            self.retry_base_delay,
        )
        .await
        {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!("primary ledger listing failed for {}: {}", path, e);
                let mirror = format!("{}{}", self.mirror_base_url, path);
                http::get_json::<T>(&self.client, &mirror, &[], 0, Duration::from_millis(0)).await
            }
        }
    }

    async fn fetch_all_packages(&self) -> Result<Vec<PackageListItem>, AdapterError> {
        let mut all = Vec::new();
        for page in 1..=self.max_pages {
            let response = self.fetch_page(page).await?;
            let count = response.data.len();
            all.extend(response.data);
            debug!("catalog page {}: {} packages ({} total)", page, count, all.len());
            if count < self.page_size as usize {
                break;
            }
        }
        if all.len() >= (self.max_pages * self.page_size) as usize {
            warn!(
                "catalog listing truncated at {} pages; raise enrichment.max_pages to cover more",
                self.max_pages
            );
        }
        Ok(all)
    }

    fn base_record(&self, item: PackageListItem) -> Option<TokenRecord> {
        let hash = item.contract_package_hash?;
        let identifier = TokenIdentifier::new(&hash);
        let metadata = item.metadata.unwrap_or_default();

        let name = item
            .name
            .or(metadata.name)
            .or(item.contract_name)
            .unwrap_or_else(|| TokenRecord::PLACEHOLDER_NAME.to_string());
        let symbol = metadata
            .symbol
            .unwrap_or_else(|| name.chars().take(4).collect::<String>().to_uppercase());

        let contribution = TokenContribution {
            name: Some(name),
            symbol: Some(symbol),
            logo_url: item.icon_url,
            description: item.description,
            decimals: Some(
                metadata
                    .decimals
                    .and_then(|d| u8::try_from(d).ok())
                    .unwrap_or(self.default_decimals),
            ),
            total_supply: Some(metadata.total_supply.unwrap_or(Decimal::ZERO)),
            owner_key: item.owner_public_key,
            created_at: item.timestamp,
            ..TokenContribution::new(SourceId::Catalog)
        };

        Some(merge::merge(
            None,
            &identifier,
            &[contribution],
            LifecycleStage::PreListing,
        ))
    }

    /// Enrich records with DEX market data in batches. Returns nothing:
    /// failures degrade to an unenriched record.
    async fn enrich(&self, records: &mut [TokenRecord]) {
        let rate = self.rate_feed.usd_rate().await;
        let total = records.len();
        let mut enriched = 0usize;
        let mut skipped = 0usize;

        for (batch_index, batch) in records.chunks_mut(self.batch_size).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }

            let outcomes = futures_util::future::join_all(
                batch
                    .iter()
                    .map(|record| self.dex.resolve(&record.identifier)),
            )
            .await;

            for (record, outcome) in batch.iter_mut().zip(outcomes) {
                match outcome.into_contribution() {
                    Some(contribution) => {
                        self.apply_market_data(record, contribution, rate);
                        enriched += 1;
                    }
                    None => skipped += 1,
                }
            }

            if (batch_index + 1) % 5 == 0 {
                debug!(
                    "catalog enrichment progress: {}/{} ({} with market data)",
                    ((batch_index + 1) * self.batch_size).min(total),
                    total,
                    enriched
                );
            }
        }

        metrics::increment_enrichment_skips(skipped as u64);
        info!(
            "catalog enrichment done: {}/{} tokens carry market data, {} without a pair",
            enriched, total, skipped
        );
    }

    fn apply_market_data(
        &self,
        record: &mut TokenRecord,
        contribution: TokenContribution,
        rate: Decimal,
    ) {
        let snapshot = contribution.snapshot.clone();
        let assessment = detect_stage(
            record.stage,
            snapshot.as_ref(),
            None,
            self.listing_threshold,
        );

        let identifier = record.identifier.clone();
        *record = merge::merge(
            Some(record.clone()),
            &identifier,
            &[contribution],
            assessment.stage,
        );
        record.stage = assessment.stage;
        record.listing_imminent = assessment.listing_imminent;

        if let Some(snapshot) = snapshot {
            let stats = price_engine::compute_stats(
                &snapshot,
                record.total_supply,
                rate,
                Some(record.volume_24h_usd),
            );
            merge::apply_computed_stats(record, &stats, SourceId::DexPair, record.stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fungible_filter_and_base_mapping() {
        let item: PackageListItem = serde_json::from_str(
            r#"{
                "contract_package_hash": "40bd4a45c414df61be3832e28ff6dcedc479744707c611fd97fea0d90619146f",
                "contract_name": "moon_token",
                "owner_public_key": "0123abc",
                "latest_version_contract_type_id": 2,
                "metadata": {
                    "name": "Moon",
                    "symbol": "MOON",
                    "decimals": 9,
                    "total_supply": "1000000000000000"
                }
            }"#,
        )
        .unwrap();

        let settings = Settings::default();
        let client = http::DEFAULT_CLIENT.clone();
        let dex = Arc::new(DexPairAdapter::new(&settings, client.clone()));
        let rate_feed = Arc::new(NativeRateFeed::new(
            client.clone(),
            settings.pricing.native_usd_fallback,
            Duration::from_secs(60),
        ));
        let builder = CatalogBuilder::new(&settings, client, dex, rate_feed);

        let record = builder.base_record(item).expect("record");
        assert_eq!(record.name, "Moon");
        assert_eq!(record.symbol, "MOON");
        assert_eq!(record.decimals, 9);
        assert_eq!(record.owner_key.as_deref(), Some("0123abc"));
        assert_eq!(record.stage, LifecycleStage::PreListing);
        assert!(!record.is_placeholder());
    }

    #[test]
    fn test_symbol_falls_back_to_name_prefix() {
        let item: PackageListItem = serde_json::from_str(
            r#"{
                "contract_package_hash": "50bd4a45c414df61be3832e28ff6dcedc479744707c611fd97fea0d90619146f",
                "name": "moonshot",
                "latest_version_contract_type_id": 2
            }"#,
        )
        .unwrap();

        let settings = Settings::default();
        let client = http::DEFAULT_CLIENT.clone();
        let dex = Arc::new(DexPairAdapter::new(&settings, client.clone()));
        let rate_feed = Arc::new(NativeRateFeed::new(
            client.clone(),
            settings.pricing.native_usd_fallback,
            Duration::from_secs(60),
        ));
        let builder = CatalogBuilder::new(&settings, client, dex, rate_feed);

        let record = builder.base_record(item).expect("record");
        assert_eq!(record.symbol, "MOON");
        assert_eq!(record.decimals, 9);
    }
}
