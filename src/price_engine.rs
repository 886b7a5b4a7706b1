// src/price_engine.rs
//
// Pure market-figure computation from reserve snapshots, with correct
// decimal handling. No I/O, no shared state; every division guards its
// denominator and degenerate inputs produce zeroes, never a NaN or panic.

use rust_decimal::Decimal;

use crate::types::{LifecycleStage, ReserveSnapshot};

/// Derived market figures for one token at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketStats {
    /// Price of one whole token in whole units of the native currency.
    pub price_in_native: Decimal,
    pub market_cap_usd: Decimal,
    pub liquidity_usd: Decimal,
    pub volume_usd: Decimal,
}

/// Helper: 10^n as Decimal, None beyond Decimal's 28-digit range.
pub fn pow10_decimal(n: u8) -> Option<Decimal> {
    if n > 27 {
        return None;
    }
    let mut value = Decimal::ONE;
    for _ in 0..n {
        value *= Decimal::from(10u32);
    }
    Some(value)
}

/// Normalize a base-unit amount into whole units using token decimals.
/// Out-of-range decimals collapse to zero rather than erroring; a snapshot
/// carrying an absurd decimals value has no usable price anyway.
pub fn normalize_amount(amount: Decimal, decimals: u8) -> Decimal {
    match pow10_decimal(decimals) {
        Some(scale) if !scale.is_zero() => amount / scale,
        _ => Decimal::ZERO,
    }
}

/// Safe ratio: `num / den`, zero when the denominator is zero.
pub fn ratio(num: Decimal, den: Decimal) -> Decimal {
    if den.is_zero() {
        return Decimal::ZERO;
    }
    num / den
}

/// Compute price, market cap, liquidity, and volume from one snapshot.
///
/// The same ratio formula applies to both lifecycle stages; which snapshot
/// is authoritative is the orchestrator's concern, not this function's.
///
/// - price = quote / base, both sides in whole units
/// - market cap = whole-unit total supply x price x native USD rate
/// - liquidity: both pool sides valued symmetrically (quote x 2) when
///   `Listed`; the single quote-side reserve when `PreListing` (the curve
///   is not a two-sided pool)
/// - volume is a passthrough (not derivable from a single snapshot)
pub fn compute_stats(
    snapshot: &ReserveSnapshot,
    total_supply: Decimal,
    native_usd: Decimal,
    reported_volume_usd: Option<Decimal>,
) -> MarketStats {
    let base_whole = normalize_amount(snapshot.base_reserve, snapshot.decimals);
    let quote_whole = normalize_amount(snapshot.quote_reserve, snapshot.decimals);

    let price_in_native = ratio(quote_whole, base_whole);

    let supply_whole = normalize_amount(total_supply, snapshot.decimals);
    let market_cap_usd = supply_whole * price_in_native * native_usd;

    let liquidity_usd = match snapshot.stage {
        LifecycleStage::Listed => quote_whole * Decimal::from(2u32) * native_usd,
        LifecycleStage::PreListing => quote_whole * native_usd,
    };

    MarketStats {
        price_in_native,
        market_cap_usd,
        liquidity_usd,
        volume_usd: reported_volume_usd.unwrap_or(Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceId;
    use chrono::Utc;
    use rust_decimal::prelude::FromPrimitive;

    fn snapshot(base: i64, quote: i64, decimals: u8, stage: LifecycleStage) -> ReserveSnapshot {
        ReserveSnapshot {
            base_reserve: Decimal::from(base),
            quote_reserve: Decimal::from(quote),
            decimals,
            stage,
            source: SourceId::DexPair,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_pow10_basic() {
        assert_eq!(pow10_decimal(0), Some(Decimal::ONE));
        assert_eq!(pow10_decimal(9), Some(Decimal::from(1_000_000_000u64)));
        assert_eq!(pow10_decimal(28), None);
    }

    #[test]
    fn test_price_is_quote_over_base_after_decimal_normalization() {
        // base 1_000_000, quote 500, decimals 9: both sides scale by the
        // same factor, so the ratio is 500 / 1_000_000 = 0.0005.
        let s = snapshot(1_000_000, 500, 9, LifecycleStage::Listed);
        let stats = compute_stats(&s, Decimal::ZERO, Decimal::ONE, None);
        assert_eq!(stats.price_in_native, Decimal::from_f64(0.0005).unwrap());
    }

    #[test]
    fn test_zero_base_reserve_yields_zero_price() {
        let s = snapshot(0, 500, 9, LifecycleStage::Listed);
        let stats = compute_stats(&s, Decimal::from(1000), Decimal::ONE, None);
        assert_eq!(stats.price_in_native, Decimal::ZERO);
        assert_eq!(stats.market_cap_usd, Decimal::ZERO);
    }

    #[test]
    fn test_market_cap_uses_whole_unit_supply_and_rate() {
        // Curve reserves 50 CSPR / 500_000 tokens -> price 0.0001 CSPR.
        let s = snapshot(500_000, 50, 0, LifecycleStage::PreListing);
        // Supply 1_000_000 whole tokens, rate $0.01.
        let stats = compute_stats(
            &s,
            Decimal::from(1_000_000),
            Decimal::new(1, 2),
            None,
        );
        assert_eq!(stats.price_in_native, Decimal::new(1, 4));
        // 1_000_000 * 0.0001 * 0.01 = 1 USD
        assert_eq!(stats.market_cap_usd, Decimal::ONE);
    }

    #[test]
    fn test_liquidity_double_counts_only_listed_pools() {
        let rate = Decimal::from(2);
        let listed = snapshot(1000, 300, 0, LifecycleStage::Listed);
        let curve = snapshot(1000, 300, 0, LifecycleStage::PreListing);

        let listed_stats = compute_stats(&listed, Decimal::ZERO, rate, None);
        let curve_stats = compute_stats(&curve, Decimal::ZERO, rate, None);

        assert_eq!(listed_stats.liquidity_usd, Decimal::from(1200)); // 300 * 2 * 2
        assert_eq!(curve_stats.liquidity_usd, Decimal::from(600)); // 300 * 2
    }

    #[test]
    fn test_volume_passthrough_defaults_to_zero() {
        let s = snapshot(1000, 300, 0, LifecycleStage::Listed);
        let with_volume = compute_stats(&s, Decimal::ZERO, Decimal::ONE, Some(Decimal::from(42)));
        let without = compute_stats(&s, Decimal::ZERO, Decimal::ONE, None);
        assert_eq!(with_volume.volume_usd, Decimal::from(42));
        assert_eq!(without.volume_usd, Decimal::ZERO);
    }

    #[test]
    fn test_absurd_decimals_collapse_to_zero() {
        let s = snapshot(1000, 300, 200, LifecycleStage::Listed);
        let stats = compute_stats(&s, Decimal::from(1000), Decimal::ONE, None);
        assert_eq!(stats.price_in_native, Decimal::ZERO);
        assert_eq!(stats.liquidity_usd, Decimal::ZERO);
    }
}
