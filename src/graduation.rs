// src/graduation.rs
//
// Lifecycle-stage evaluation. The stage transition is one-way: an observed
// listed snapshot with real reserves makes the stage permanently Listed,
// and nothing reverts it. Crossing the configured listing threshold on the
// curve only flags imminent listing for display; the curve-side number and
// the DEX's number are not guaranteed to agree on the crossing moment, so
// only an actual listed snapshot flips the stored stage.

use rust_decimal::Decimal;

use crate::price_engine::normalize_amount;
use crate::types::{LifecycleStage, ReserveSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageAssessment {
    pub stage: LifecycleStage,
    /// Curve reserve crossed the listing threshold without an observed
    /// listed snapshot yet. Display only.
    pub listing_imminent: bool,
}

pub fn detect_stage(
    current: LifecycleStage,
    listed_snapshot: Option<&ReserveSnapshot>,
    curve_snapshot: Option<&ReserveSnapshot>,
    listing_threshold_native: Decimal,
) -> StageAssessment {
    // Once listed, always listed; stale curve echoes are ignored.
    if current == LifecycleStage::Listed {
        return StageAssessment {
            stage: LifecycleStage::Listed,
            listing_imminent: false,
        };
    }

    if let Some(snapshot) = listed_snapshot {
        if snapshot.stage == LifecycleStage::Listed && snapshot.has_reserves() {
            return StageAssessment {
                stage: LifecycleStage::Listed,
                listing_imminent: false,
            };
        }
    }

    let listing_imminent = curve_snapshot
        .map(|s| normalize_amount(s.quote_reserve, s.decimals) >= listing_threshold_native)
        .unwrap_or(false);

    StageAssessment {
        stage: LifecycleStage::PreListing,
        listing_imminent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceId;
    use chrono::Utc;

    const THRESHOLD: u64 = 100_000;

    fn snapshot(base: i64, quote: i64, stage: LifecycleStage) -> ReserveSnapshot {
        ReserveSnapshot {
            base_reserve: Decimal::from(base),
            quote_reserve: Decimal::from(quote),
            decimals: 0,
            stage,
            source: SourceId::DexPair,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_listed_snapshot_flips_stage() {
        let listed = snapshot(2_000_000, 1200, LifecycleStage::Listed);
        let result = detect_stage(
            LifecycleStage::PreListing,
            Some(&listed),
            None,
            Decimal::from(THRESHOLD),
        );
        assert_eq!(result.stage, LifecycleStage::Listed);
        assert!(!result.listing_imminent);
    }

    #[test]
    fn test_zero_reserve_listed_snapshot_does_not_flip() {
        let empty = snapshot(0, 0, LifecycleStage::Listed);
        let result = detect_stage(
            LifecycleStage::PreListing,
            Some(&empty),
            None,
            Decimal::from(THRESHOLD),
        );
        assert_eq!(result.stage, LifecycleStage::PreListing);
    }

    #[test]
    fn test_stage_never_reverts_after_listing() {
        // Curve adapter still echoes a pre-listing snapshot, DEX pair gone.
        let curve = snapshot(500_000, 50, LifecycleStage::PreListing);
        let result = detect_stage(
            LifecycleStage::Listed,
            None,
            Some(&curve),
            Decimal::from(THRESHOLD),
        );
        assert_eq!(result.stage, LifecycleStage::Listed);
    }

    #[test]
    fn test_threshold_crossing_flags_but_does_not_flip() {
        let curve = snapshot(500_000, 150_000, LifecycleStage::PreListing);
        let result = detect_stage(
            LifecycleStage::PreListing,
            None,
            Some(&curve),
            Decimal::from(THRESHOLD),
        );
        assert_eq!(result.stage, LifecycleStage::PreListing);
        assert!(result.listing_imminent);
    }

    #[test]
    fn test_below_threshold_is_not_imminent() {
        let curve = snapshot(500_000, 50, LifecycleStage::PreListing);
        let result = detect_stage(
            LifecycleStage::PreListing,
            None,
            Some(&curve),
            Decimal::from(THRESHOLD),
        );
        assert!(!result.listing_imminent);
    }
}
