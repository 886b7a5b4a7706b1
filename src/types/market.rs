// src/types/market.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::identifier::TokenIdentifier;

/// Lifecycle stage of a token: still accumulating reserves on its bonding
/// curve, or listed on an AMM pair. The transition is one-directional;
/// once `Listed`, a record never reverts (see the graduation detector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    PreListing,
    Listed,
}

/// The four upstream providers, in identity-field priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    LaunchCurve,
    Catalog,
    LedgerStats,
    DexPair,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::LaunchCurve => "launch_curve",
            SourceId::Catalog => "catalog",
            SourceId::LedgerStats => "ledger_stats",
            SourceId::DexPair => "dex_pair",
        }
    }
}

/// Whether a contribution's counts were read from the authoritative ledger
/// endpoints or estimated heuristically (deploy-count based). Estimates
/// rank below every authoritative source in the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Authoritative,
    Estimated,
}

/// Merge-tracked fields of a [`TokenRecord`]. Provenance is recorded per
/// field so a lower-priority source can never clobber a higher-priority
/// write within a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Symbol,
    LogoUrl,
    Description,
    Decimals,
    TotalSupply,
    CirculatingSupply,
    OwnerKey,
    Socials,
    TaxPercentage,
    CreatedAt,
    HolderCount,
    TransferCount,
    TxCount,
    LiquidityProviderCount,
    PriceInNative,
    MarketCapUsd,
    LiquidityUsd,
    Volume24hUsd,
}

impl Field {
    /// Pricing fields follow a stage-dependent priority order distinct from
    /// identity fields (see [`crate::merge`]).
    pub fn is_pricing(&self) -> bool {
        matches!(
            self,
            Field::PriceInNative | Field::MarketCapUsd | Field::LiquidityUsd | Field::Volume24hUsd
        )
    }
}

/// One provider's view of the two-sided liquidity backing a token.
///
/// `base_reserve` is the token side, `quote_reserve` the native (CSPR)
/// side, both in base units; `decimals` converts to whole units. Snapshots
/// are immutable: a newer reading replaces the whole snapshot, never a
/// single side (reserves read at different times do not form a price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveSnapshot {
    pub base_reserve: Decimal,
    pub quote_reserve: Decimal,
    pub decimals: u8,
    pub stage: LifecycleStage,
    pub source: SourceId,
    pub observed_at: DateTime<Utc>,
}

impl ReserveSnapshot {
    pub fn has_reserves(&self) -> bool {
        self.base_reserve > Decimal::ZERO && self.quote_reserve > Decimal::ZERO
    }
}

/// Social links supplied by the launch-curve catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub discord: Option<String>,
}

impl SocialLinks {
    pub fn is_empty(&self) -> bool {
        self.website.is_none()
            && self.twitter.is_none()
            && self.telegram.is_none()
            && self.discord.is_none()
    }
}

/// The partial record one adapter contributes to a resolution pass.
///
/// Every field is optional; the merge engine folds contributions together
/// under the per-field priority rules. `graduated_hint` marks a
/// launch-curve entry flagged as graduated upstream: its snapshot is kept
/// for display but carries no pricing authority (stale-echo rule).
#[derive(Debug, Clone, Default)]
pub struct TokenContribution {
    pub source: Option<SourceId>,
    pub confidence: Option<Confidence>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<Decimal>,
    pub circulating_supply: Option<Decimal>,
    pub owner_key: Option<String>,
    pub socials: Option<SocialLinks>,
    pub tax_percentage: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub holder_count: Option<u64>,
    pub transfer_count: Option<u64>,
    pub tx_count: Option<u64>,
    pub liquidity_provider_count: Option<u64>,
    pub volume_usd: Option<Decimal>,
    pub snapshot: Option<ReserveSnapshot>,
    pub graduated_hint: bool,
}

impl TokenContribution {
    pub fn new(source: SourceId) -> Self {
        Self {
            source: Some(source),
            confidence: Some(Confidence::Authoritative),
            ..Default::default()
        }
    }

    pub fn source(&self) -> SourceId {
        self.source.unwrap_or(SourceId::Catalog)
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence.unwrap_or(Confidence::Authoritative)
    }
}

/// The resolved output of the SDK: one consistent view of a token.
///
/// Mutated only by the merge engine during a resolution pass; callers
/// always observe either the previous complete record or the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub identifier: TokenIdentifier,
    pub name: String,
    pub symbol: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub decimals: u8,
    pub total_supply: Decimal,
    pub circulating_supply: Option<Decimal>,
    pub owner_key: Option<String>,
    pub socials: SocialLinks,
    pub tax_percentage: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub stage: LifecycleStage,
    /// Set when the curve reserve crossed the listing threshold but no
    /// listed snapshot has been observed yet. Display only.
    pub listing_imminent: bool,
    pub price_in_native: Decimal,
    pub market_cap_usd: Decimal,
    pub liquidity_usd: Decimal,
    pub volume_24h_usd: Decimal,
    pub holder_count: u64,
    pub transfer_count: u64,
    pub tx_count: u64,
    pub liquidity_provider_count: u64,
    /// Priority rank of the source that last wrote each field.
    pub field_provenance: HashMap<Field, u8>,
    pub resolved_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Display placeholder returned when no adapter matched; callers must
    /// always receive a renderable record.
    pub const PLACEHOLDER_NAME: &'static str = "Unknown Token";

    /// A minimal record carrying only the identifier and placeholder
    /// identity. Every numeric field is zero, stage is `PreListing`.
    pub fn placeholder(identifier: TokenIdentifier) -> Self {
        let symbol = identifier
            .canonical()
            .chars()
            .take(4)
            .collect::<String>()
            .to_uppercase();
        Self {
            identifier,
            name: Self::PLACEHOLDER_NAME.to_string(),
            symbol: if symbol.is_empty() { "TKN".to_string() } else { symbol },
            logo_url: None,
            description: None,
            decimals: 9,
            total_supply: Decimal::ZERO,
            circulating_supply: None,
            owner_key: None,
            socials: SocialLinks::default(),
            tax_percentage: None,
            created_at: None,
            stage: LifecycleStage::PreListing,
            listing_imminent: false,
            price_in_native: Decimal::ZERO,
            market_cap_usd: Decimal::ZERO,
            liquidity_usd: Decimal::ZERO,
            volume_24h_usd: Decimal::ZERO,
            holder_count: 0,
            transfer_count: 0,
            tx_count: 0,
            liquidity_provider_count: 0,
            field_provenance: HashMap::new(),
            resolved_at: Utc::now(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == Self::PLACEHOLDER_NAME && self.field_provenance.is_empty()
    }
}
