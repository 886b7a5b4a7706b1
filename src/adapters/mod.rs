// Source Adapters Module
// Provides a unified interface for the four upstream market-data providers

pub mod catalog;
pub mod dex_pair;
pub mod launch_curve;
pub mod ledger_stats;

// Re-export the trait
pub use crate::source_adapter::SourceAdapter;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Upstream APIs are inconsistent about numeric encoding: big amounts come
/// as strings, counts sometimes as numbers. Deserialize either form.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(f64),
    Str(String),
}

fn num_or_str_to_decimal(value: NumOrStr) -> Option<Decimal> {
    match value {
        NumOrStr::Num(n) => Decimal::from_f64(n),
        NumOrStr::Str(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<Decimal>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(Decimal::from_f64))
        }
    }
}

pub(crate) fn flexible_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumOrStr>::deserialize(deserializer)?;
    Ok(value.and_then(num_or_str_to_decimal))
}

pub(crate) fn flexible_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumOrStr>::deserialize(deserializer)?;
    Ok(value
        .and_then(num_or_str_to_decimal)
        .and_then(|d| d.trunc().to_u64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "flexible_decimal")]
        amount: Option<Decimal>,
        #[serde(default, deserialize_with = "flexible_u64")]
        count: Option<u64>,
    }

    #[test]
    fn test_flexible_numbers_accept_both_encodings() {
        let from_strings: Probe =
            serde_json::from_str(r#"{"amount": "1500000000", "count": "42"}"#).unwrap();
        assert_eq!(from_strings.amount, Some(Decimal::from(1_500_000_000u64)));
        assert_eq!(from_strings.count, Some(42));

        let from_numbers: Probe =
            serde_json::from_str(r#"{"amount": 1500000000, "count": 42}"#).unwrap();
        assert_eq!(from_numbers.amount, Some(Decimal::from(1_500_000_000u64)));
        assert_eq!(from_numbers.count, Some(42));

        let missing: Probe = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.amount, None);
        assert_eq!(missing.count, None);

        let junk: Probe = serde_json::from_str(r#"{"amount": "not-a-number"}"#).unwrap();
        assert_eq!(junk.amount, None);
    }
}
