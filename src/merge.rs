// src/merge.rs
//
// Provenance-ranked reconciliation of adapter contributions into one
// TokenRecord. The merge is priority-monotonic: a field written at some
// rank is only overwritten by an equal-or-higher rank, so a lower-priority
// adapter can never clobber a higher-priority write regardless of the
// order results arrive in. Fields no contribution touches keep their value
// from the existing record; the merge is incremental, never a reset.

use std::collections::HashMap;

use crate::identifier::TokenIdentifier;
use crate::types::{
    Confidence, Field, LifecycleStage, SourceId, TokenContribution, TokenRecord,
};

/// Numeric priority of a (source, confidence) pair for one field.
///
/// Identity fields rank LaunchCurve > Catalog > LedgerStats > DexPair.
/// Pricing fields follow the same order while a token is pre-listing, but
/// flip to DexPair-first once listed (the pair is then the authoritative
/// reserve source). Estimated contributions rank below every authoritative
/// one so a later authoritative read within the same cache horizon wins.
pub fn priority(
    source: SourceId,
    confidence: Confidence,
    field: Field,
    stage: LifecycleStage,
) -> u8 {
    if confidence == Confidence::Estimated {
        return 1;
    }
    if field.is_pricing() && stage == LifecycleStage::Listed {
        return match source {
            SourceId::DexPair => 40,
            SourceId::LaunchCurve => 30,
            SourceId::LedgerStats => 20,
            SourceId::Catalog => 10,
        };
    }
    match source {
        SourceId::LaunchCurve => 40,
        SourceId::Catalog => 30,
        SourceId::LedgerStats => 20,
        SourceId::DexPair => 10,
    }
}

fn rank_allows(provenance: &HashMap<Field, u8>, field: Field, rank: u8) -> bool {
    match provenance.get(&field) {
        Some(existing) => *existing <= rank,
        None => true,
    }
}

fn apply<T: Clone>(
    target: &mut T,
    value: Option<&T>,
    field: Field,
    rank: u8,
    provenance: &mut HashMap<Field, u8>,
) {
    if let Some(v) = value {
        if rank_allows(provenance, field, rank) {
            *target = v.clone();
            provenance.insert(field, rank);
        }
    }
}

fn apply_optional<T: Clone>(
    target: &mut Option<T>,
    value: Option<&T>,
    field: Field,
    rank: u8,
    provenance: &mut HashMap<Field, u8>,
) {
    if let Some(v) = value {
        if rank_allows(provenance, field, rank) {
            *target = Some(v.clone());
            provenance.insert(field, rank);
        }
    }
}

/// Fold `contributions` into `existing` (or a fresh placeholder) under the
/// per-field priority rules. Contributions are processed in descending
/// identity priority; the provenance check makes the result independent of
/// that order, but processing high-to-low mirrors the commit order the
/// orchestrator guarantees.
pub fn merge(
    existing: Option<TokenRecord>,
    identifier: &TokenIdentifier,
    contributions: &[TokenContribution],
    stage: LifecycleStage,
) -> TokenRecord {
    let mut record =
        existing.unwrap_or_else(|| TokenRecord::placeholder(identifier.clone()));
    record.identifier = identifier.clone();

    let mut ordered: Vec<&TokenContribution> = contributions.iter().collect();
    ordered.sort_by_key(|c| {
        std::cmp::Reverse(priority(c.source(), c.confidence(), Field::Name, stage))
    });

    for contribution in ordered {
        let source = contribution.source();
        let confidence = contribution.confidence();
        let rank = |field: Field| priority(source, confidence, field, stage);
        let prov = &mut record.field_provenance;

        apply(&mut record.name, contribution.name.as_ref(), Field::Name, rank(Field::Name), prov);
        apply(&mut record.symbol, contribution.symbol.as_ref(), Field::Symbol, rank(Field::Symbol), prov);
        apply_optional(&mut record.logo_url, contribution.logo_url.as_ref(), Field::LogoUrl, rank(Field::LogoUrl), prov);
        apply_optional(&mut record.description, contribution.description.as_ref(), Field::Description, rank(Field::Description), prov);
        apply(&mut record.decimals, contribution.decimals.as_ref(), Field::Decimals, rank(Field::Decimals), prov);
        apply(&mut record.total_supply, contribution.total_supply.as_ref(), Field::TotalSupply, rank(Field::TotalSupply), prov);
        apply_optional(&mut record.circulating_supply, contribution.circulating_supply.as_ref(), Field::CirculatingSupply, rank(Field::CirculatingSupply), prov);
        apply_optional(&mut record.owner_key, contribution.owner_key.as_ref(), Field::OwnerKey, rank(Field::OwnerKey), prov);
        apply(&mut record.socials, contribution.socials.as_ref(), Field::Socials, rank(Field::Socials), prov);
        apply_optional(&mut record.tax_percentage, contribution.tax_percentage.as_ref(), Field::TaxPercentage, rank(Field::TaxPercentage), prov);
        apply_optional(&mut record.created_at, contribution.created_at.as_ref(), Field::CreatedAt, rank(Field::CreatedAt), prov);
        apply(&mut record.holder_count, contribution.holder_count.as_ref(), Field::HolderCount, rank(Field::HolderCount), prov);
        apply(&mut record.transfer_count, contribution.transfer_count.as_ref(), Field::TransferCount, rank(Field::TransferCount), prov);
        apply(&mut record.tx_count, contribution.tx_count.as_ref(), Field::TxCount, rank(Field::TxCount), prov);
        apply(&mut record.liquidity_provider_count, contribution.liquidity_provider_count.as_ref(), Field::LiquidityProviderCount, rank(Field::LiquidityProviderCount), prov);
        apply(&mut record.volume_24h_usd, contribution.volume_usd.as_ref(), Field::Volume24hUsd, rank(Field::Volume24hUsd), prov);
    }

    record
}

/// Record the price-engine outputs with the provenance of the snapshot
/// source they were computed from.
pub fn apply_computed_stats(
    record: &mut TokenRecord,
    stats: &crate::price_engine::MarketStats,
    snapshot_source: SourceId,
    stage: LifecycleStage,
) {
    let prov = &mut record.field_provenance;
    for (field, value) in [
        (Field::PriceInNative, stats.price_in_native),
        (Field::MarketCapUsd, stats.market_cap_usd),
        (Field::LiquidityUsd, stats.liquidity_usd),
    ] {
        let rank = priority(snapshot_source, Confidence::Authoritative, field, stage);
        if rank_allows(prov, field, rank) {
            match field {
                Field::PriceInNative => record.price_in_native = value,
                Field::MarketCapUsd => record.market_cap_usd = value,
                Field::LiquidityUsd => record.liquidity_usd = value,
                _ => unreachable!(),
            }
            prov.insert(field, rank);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> TokenIdentifier {
        TokenIdentifier::new("40bd4a45c414df61be3832e28ff6dcedc479744707c611fd97fea0d90619146f")
    }

    fn named(source: SourceId, name: &str) -> TokenContribution {
        TokenContribution {
            name: Some(name.to_string()),
            ..TokenContribution::new(source)
        }
    }

    #[test]
    fn test_higher_priority_wins_regardless_of_order() {
        use itertools::Itertools;

        let id = id();
        let contributions = vec![
            named(SourceId::DexPair, "from-dex"),
            named(SourceId::LaunchCurve, "from-curve"),
            named(SourceId::LedgerStats, "from-ledger"),
        ];

        for ordering in contributions.iter().cloned().permutations(3) {
            let record = merge(None, &id, &ordering, LifecycleStage::PreListing);
            assert_eq!(
                record.name, "from-curve",
                "launch-curve name must win for ordering {:?}",
                ordering.iter().map(|c| c.source()).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_lower_priority_fills_gaps() {
        let record = merge(
            None,
            &id(),
            &[
                named(SourceId::LaunchCurve, "curve-name"),
                TokenContribution {
                    symbol: Some("DEX".to_string()),
                    ..TokenContribution::new(SourceId::DexPair)
                },
            ],
            LifecycleStage::PreListing,
        );
        assert_eq!(record.name, "curve-name");
        assert_eq!(record.symbol, "DEX");
    }

    #[test]
    fn test_untouched_fields_keep_previous_value() {
        let id = id();
        let first = merge(
            None,
            &id,
            &[named(SourceId::LaunchCurve, "curve-name")],
            LifecycleStage::PreListing,
        );
        let second = merge(
            Some(first),
            &id,
            &[TokenContribution {
                holder_count: Some(7),
                ..TokenContribution::new(SourceId::LedgerStats)
            }],
            LifecycleStage::PreListing,
        );
        assert_eq!(second.name, "curve-name");
        assert_eq!(second.holder_count, 7);
    }

    #[test]
    fn test_estimated_never_overwrites_authoritative() {
        let id = id();
        let authoritative = merge(
            None,
            &id,
            &[TokenContribution {
                holder_count: Some(100),
                ..TokenContribution::new(SourceId::LedgerStats)
            }],
            LifecycleStage::PreListing,
        );
        let merged = merge(
            Some(authoritative),
            &id,
            &[TokenContribution {
                confidence: Some(Confidence::Estimated),
                holder_count: Some(3),
                ..TokenContribution::new(SourceId::LedgerStats)
            }],
            LifecycleStage::PreListing,
        );
        assert_eq!(merged.holder_count, 100);
    }

    #[test]
    fn test_authoritative_replaces_earlier_estimate() {
        let id = id();
        let estimated = merge(
            None,
            &id,
            &[TokenContribution {
                confidence: Some(Confidence::Estimated),
                holder_count: Some(3),
                ..TokenContribution::new(SourceId::LedgerStats)
            }],
            LifecycleStage::PreListing,
        );
        let merged = merge(
            Some(estimated),
            &id,
            &[TokenContribution {
                holder_count: Some(100),
                ..TokenContribution::new(SourceId::LedgerStats)
            }],
            LifecycleStage::PreListing,
        );
        assert_eq!(merged.holder_count, 100);
    }

    #[test]
    fn test_pricing_priority_flips_once_listed() {
        let curve_volume = TokenContribution {
            volume_usd: Some(rust_decimal::Decimal::from(10)),
            ..TokenContribution::new(SourceId::LaunchCurve)
        };
        let dex_volume = TokenContribution {
            volume_usd: Some(rust_decimal::Decimal::from(99)),
            ..TokenContribution::new(SourceId::DexPair)
        };

        let pre = merge(
            None,
            &id(),
            &[curve_volume.clone(), dex_volume.clone()],
            LifecycleStage::PreListing,
        );
        let listed = merge(
            None,
            &id(),
            &[curve_volume, dex_volume],
            LifecycleStage::Listed,
        );

        assert_eq!(pre.volume_24h_usd, rust_decimal::Decimal::from(10));
        assert_eq!(listed.volume_24h_usd, rust_decimal::Decimal::from(99));
    }
}
