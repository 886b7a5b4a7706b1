//! # Resolution Orchestrator
//!
//! The `ResolutionOrchestrator` is the SDK's entry point. It coordinates
//! identifier normalization, the four source adapters, the merge engine,
//! the price engine, the graduation detector, and both cache tiers behind
//! two operations: `resolve()` and `list_all()`.
//!
//! ## Resolution pipeline
//!
//! 1. Normalize the raw identifier
//! 2. Start all adapters concurrently, each individually time-bounded
//! 3. Commit results in strict priority order through the merge engine
//! 4. Price from the reserve snapshot matching the resolved stage
//! 5. Detect graduation, write through the cache tiers, return the record
//!
//! ## Guarantees
//!
//! - `resolve()` always terminates with a renderable record; when no
//!   adapter matches, a minimal placeholder comes back instead of an error
//! - At most one resolution is in flight per canonical identifier;
//!   concurrent callers share the same future and result
//! - A lower-priority adapter result arriving early can never clobber a
//!   higher-priority one: commits happen in priority order regardless of
//!   arrival order
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cspr_market_sdk::{ResolutionOrchestrator, Settings};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let orchestrator = ResolutionOrchestrator::new(Settings::new()?)?;
//! let record = orchestrator.resolve("hash-40bd4a45c414df61be3832e2...").await;
//! println!("{} {} {}", record.name, record.price_in_native, record.market_cap_usd);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::adapters::catalog::CatalogAdapter;
use crate::adapters::dex_pair::DexPairAdapter;
use crate::adapters::launch_curve::LaunchCurveAdapter;
use crate::adapters::ledger_stats::LedgerStatsAdapter;
use crate::cache::CatalogCache;
use crate::catalog_builder::CatalogBuilder;
use crate::graduation::detect_stage;
use crate::http;
use crate::identifier::TokenIdentifier;
use crate::merge;
use crate::metrics;
use crate::native_price::NativeRateFeed;
use crate::price_engine;
use crate::settings::Settings;
use crate::source_adapter::{Outcome, SourceAdapter};
use crate::types::{Confidence, Field, LifecycleStage, ReserveSnapshot, SourceId, TokenRecord};

type SharedResolution = Shared<BoxFuture<'static, TokenRecord>>;

/// Coordinates token resolution across the four upstream providers.
pub struct ResolutionOrchestrator {
    settings: Arc<Settings>,
    adapters: Arc<Vec<Arc<dyn SourceAdapter>>>,
    catalog: Arc<CatalogCache>,
    builder: Option<Arc<CatalogBuilder>>,
    rate_feed: Arc<NativeRateFeed>,
    inflight: Arc<DashMap<String, SharedResolution>>,
}

impl ResolutionOrchestrator {
    /// Full wiring against the real upstream endpoints.
    pub fn new(settings: Settings) -> Result<Self> {
        let settings = Arc::new(settings);
        let client = http::build_client(Duration::from_secs(
            settings.http.adapter_timeout_seconds,
        ))?;

        let catalog = Arc::new(CatalogCache::new(&settings.cache.catalog_version_key));
        let rate_feed = Arc::new(NativeRateFeed::new(
            client.clone(),
            settings.pricing.native_usd_fallback,
            Duration::from_secs(settings.pricing.rate_ttl_seconds),
        ));
        let dex = Arc::new(DexPairAdapter::new(&settings, client.clone()));
        let builder = Arc::new(CatalogBuilder::new(
            &settings,
            client.clone(),
            dex.clone(),
            rate_feed.clone(),
        ));

        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(LaunchCurveAdapter::new(&settings, client.clone())),
            Arc::new(CatalogAdapter::new(catalog.clone())),
            Arc::new(LedgerStatsAdapter::new(&settings, client)),
            dex,
        ];

        Ok(Self {
            settings,
            adapters: Arc::new(adapters),
            catalog,
            builder: Some(builder),
            rate_feed,
            inflight: Arc::new(DashMap::new()),
        })
    }

    /// Wiring with injected adapters and caches. This is the seam tests
    /// and embedders use to substitute providers; `list_all()` then serves
    /// whatever the injected catalog tier holds.
    pub fn with_adapters(
        settings: Arc<Settings>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        catalog: Arc<CatalogCache>,
        rate_feed: Arc<NativeRateFeed>,
    ) -> Self {
        Self {
            settings,
            adapters: Arc::new(adapters),
            catalog,
            builder: None,
            rate_feed,
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Resolve one identifier into a complete record. Infallible: the
    /// worst case is a placeholder record carrying just the identifier.
    pub async fn resolve(&self, raw_identifier: &str) -> TokenRecord {
        let identifier = TokenIdentifier::new(raw_identifier);
        let key = identifier.canonical().to_string();

        let shared = {
            match self.inflight.entry(key.clone()) {
                Entry::Occupied(entry) => {
                    metrics::increment_dedup_hit();
                    debug!(identifier = %identifier, "joining in-flight resolution");
                    entry.get().clone()
                }
                Entry::Vacant(entry) => {
                    let future = Self::run_resolution(
                        self.settings.clone(),
                        self.adapters.clone(),
                        self.catalog.clone(),
                        self.rate_feed.clone(),
                        self.inflight.clone(),
                        identifier,
                        key.clone(),
                    )
                    .boxed()
                    .shared();
                    entry.insert(future.clone());
                    future
                }
            }
        };

        shared.await
    }

    /// The enriched full catalog, built once on first call (single-flight)
    /// and process-lifetime cached.
    pub async fn list_all(&self) -> Vec<TokenRecord> {
        match &self.builder {
            Some(builder) => {
                let builder = builder.clone();
                self.catalog
                    .get_or_build(move || async move { builder.build().await })
                    .await
            }
            None => self.catalog.list(),
        }
    }

    /// Force a fresh catalog build and install it, replacing the current
    /// tier contents. Used by the background catalog service; `list_all`
    /// itself never rebuilds.
    pub async fn rebuild_catalog(&self) -> Vec<TokenRecord> {
        if let Some(builder) = &self.builder {
            match builder.build().await {
                Ok(records) => self.catalog.install(records),
                Err(e) => warn!("catalog rebuild failed, keeping current tier: {}", e),
            }
        }
        self.catalog.list()
    }

    async fn run_resolution(
        settings: Arc<Settings>,
        adapters: Arc<Vec<Arc<dyn SourceAdapter>>>,
        catalog: Arc<CatalogCache>,
        rate_feed: Arc<NativeRateFeed>,
        inflight: Arc<DashMap<String, SharedResolution>>,
        identifier: TokenIdentifier,
        key: String,
    ) -> TokenRecord {
        let started = Instant::now();
        let timeout = Duration::from_secs(settings.http.adapter_timeout_seconds);

        // Start every adapter concurrently; each is individually bounded
        // and a timeout counts as NotFound.
        let attempts = adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            let identifier = identifier.clone();
            async move {
                let source = adapter.source();
                match tokio::time::timeout(timeout, adapter.resolve(&identifier)).await {
                    Ok(outcome) => {
                        let label = match &outcome {
                            Outcome::Found(_) => "found",
                            Outcome::NotFound => "not_found",
                        };
                        metrics::increment_adapter_outcome(source.as_str(), label);
                        (source, outcome)
                    }
                    Err(_) => {
                        warn!(source = source.as_str(), identifier = %identifier, "adapter timed out");
                        metrics::increment_adapter_outcome(source.as_str(), "timeout");
                        (source, Outcome::NotFound)
                    }
                }
            }
        });
        let mut results = futures::future::join_all(attempts).await;

        // Commit in strict priority order: arrival order is irrelevant.
        results.sort_by_key(|(source, _)| {
            std::cmp::Reverse(merge::priority(
                *source,
                Confidence::Authoritative,
                Field::Name,
                LifecycleStage::PreListing,
            ))
        });
        let contributions: Vec<_> = results
            .into_iter()
            .filter_map(|(_, outcome)| outcome.into_contribution())
            .collect();

        let existing = catalog.lookup(&identifier);
        let prior_stage = existing
            .as_ref()
            .map(|record| record.stage)
            .unwrap_or(LifecycleStage::PreListing);

        let record = if contributions.is_empty() {
            debug!(identifier = %identifier, "no adapter matched, returning placeholder");
            metrics::increment_resolution("placeholder");
            existing.unwrap_or_else(|| TokenRecord::placeholder(identifier.clone()))
        } else {
            let listed_snapshot = contributions
                .iter()
                .filter_map(|c| c.snapshot.as_ref())
                .find(|s| s.stage == LifecycleStage::Listed && s.has_reserves())
                .cloned();
            // Any curve snapshot informs the imminence flag; only a
            // non-graduated one carries pricing authority (stale echoes
            // from a since-listed token are display-only).
            let curve_display_snapshot = best_curve_snapshot(&contributions, true);
            let curve_pricing_snapshot = best_curve_snapshot(&contributions, false);

            let assessment = detect_stage(
                prior_stage,
                listed_snapshot.as_ref(),
                curve_display_snapshot.as_ref(),
                settings.pricing.listing_threshold_native,
            );

            let mut record =
                merge::merge(existing, &identifier, &contributions, assessment.stage);
            record.stage = assessment.stage;
            record.listing_imminent = assessment.listing_imminent;

            let authoritative = match assessment.stage {
                LifecycleStage::Listed => listed_snapshot,
                LifecycleStage::PreListing => curve_pricing_snapshot,
            };
            if let Some(snapshot) = authoritative {
                let rate = rate_feed.usd_rate().await;
                let stats = price_engine::compute_stats(
                    &snapshot,
                    record.total_supply,
                    rate,
                    Some(record.volume_24h_usd),
                );
                let record_stage = record.stage;
                merge::apply_computed_stats(&mut record, &stats, snapshot.source, record_stage);
            }
            record.resolved_at = Utc::now();

            // Write-through: the enriched tier serves both per-token
            // lookups and list_all. Placeholders are never written.
            catalog.upsert(record.clone());
            metrics::increment_resolution("resolved");
            info!(
                identifier = %identifier,
                stage = ?record.stage,
                price = %record.price_in_native,
                "resolved token"
            );
            record
        };

        metrics::record_resolution_duration_ms(started.elapsed().as_millis() as f64);
        // Cleared only after merge and cache write are complete, so a
        // caller arriving now either joins this future or sees the cache.
        inflight.remove(&key);
        record
    }
}

/// The most authoritative pre-listing snapshot among the contributions:
/// launch-curve first, ledger-derived as fallback. With
/// `include_graduated` false, curve entries flagged graduated upstream are
/// skipped.
fn best_curve_snapshot(
    contributions: &[crate::types::TokenContribution],
    include_graduated: bool,
) -> Option<ReserveSnapshot> {
    let pick = |source: SourceId| {
        contributions
            .iter()
            .filter(|c| c.source() == source && (include_graduated || !c.graduated_hint))
            .filter_map(|c| c.snapshot.as_ref())
            .find(|s| s.stage == LifecycleStage::PreListing)
            .cloned()
    };
    pick(SourceId::LaunchCurve).or_else(|| pick(SourceId::LedgerStats))
}
