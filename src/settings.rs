use config::{Config, ConfigError, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Endpoints {
    #[serde(default = "default_launch_curve_base_url")]
    pub launch_curve_base_url: String,
    #[serde(default = "default_ledger_base_url")]
    pub ledger_base_url: String,
    /// Public mirror tried when the primary ledger endpoint fails.
    #[serde(default = "default_ledger_mirror_base_url")]
    pub ledger_mirror_base_url: String,
    #[serde(default = "default_dex_base_url")]
    pub dex_base_url: String,
    /// Wrapped-native (WCSPR) contract hash used as the quote side of every
    /// DEX pair query.
    #[serde(default = "default_native_pair_hash")]
    pub native_pair_hash: String,
    #[serde(default)]
    pub ledger_api_key: Option<String>,
}

fn default_launch_curve_base_url() -> String {
    "https://api.cspr.fun/api/v1".to_string()
}
fn default_ledger_base_url() -> String {
    "https://api.cspr.cloud".to_string()
}
fn default_ledger_mirror_base_url() -> String {
    "https://api.cspr.live".to_string()
}
fn default_dex_base_url() -> String {
    "https://api.friendly.market/api/v1/amm".to_string()
}
fn default_native_pair_hash() -> String {
    "40bd4a45c414df61be3832e28ff6dcedc479744707c611fd97fea0d90619146f".to_string()
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            launch_curve_base_url: default_launch_curve_base_url(),
            ledger_base_url: default_ledger_base_url(),
            ledger_mirror_base_url: default_ledger_mirror_base_url(),
            dex_base_url: default_dex_base_url(),
            native_pair_hash: default_native_pair_hash(),
            ledger_api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Http {
    /// Per-adapter call budget; a timed-out adapter counts as NotFound.
    #[serde(default = "default_adapter_timeout_seconds")]
    pub adapter_timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_adapter_timeout_seconds() -> u64 {
    8
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_base_delay_ms() -> u64 {
    250
}

impl Default for Http {
    fn default() -> Self {
        Self {
            adapter_timeout_seconds: default_adapter_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Pricing {
    /// Used when both external rate APIs fail. External platform policy,
    /// not a protocol constant.
    #[serde(default = "default_native_usd_fallback")]
    pub native_usd_fallback: Decimal,
    /// Curve quote-side reserve (whole CSPR) at which listing is imminent.
    #[serde(default = "default_listing_threshold_native")]
    pub listing_threshold_native: Decimal,
    #[serde(default = "default_token_decimals")]
    pub default_token_decimals: u8,
    #[serde(default = "default_rate_ttl_seconds")]
    pub rate_ttl_seconds: u64,
}

fn default_native_usd_fallback() -> Decimal {
    Decimal::new(59, 4) // 0.0059 USD
}
fn default_listing_threshold_native() -> Decimal {
    Decimal::from(100_000u64)
}
fn default_token_decimals() -> u8 {
    9
}
fn default_rate_ttl_seconds() -> u64 {
    60
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            native_usd_fallback: default_native_usd_fallback(),
            listing_threshold_native: default_listing_threshold_native(),
            default_token_decimals: default_token_decimals(),
            rate_ttl_seconds: default_rate_ttl_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Cache {
    /// TTL of the launch-curve catalog snapshot.
    #[serde(default = "default_curve_catalog_ttl_seconds")]
    pub curve_catalog_ttl_seconds: u64,
    /// Version key of the process-lifetime enriched catalog. Bump when
    /// enrichment logic changes; the whole tier invalidates atomically.
    #[serde(default = "default_catalog_version_key")]
    pub catalog_version_key: String,
}

fn default_curve_catalog_ttl_seconds() -> u64 {
    300
}
fn default_catalog_version_key() -> String {
    "v2-market-caps".to_string()
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            curve_catalog_ttl_seconds: default_curve_catalog_ttl_seconds(),
            catalog_version_key: default_catalog_version_key(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Enrichment {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Ledger contract-type id of fungible token packages.
    #[serde(default = "default_fungible_contract_type_id")]
    pub fungible_contract_type_id: u32,
    /// Throttling policy against the DEX endpoint, not a correctness
    /// requirement: tokens per batch and delay between batches.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_refresh_interval_seconds")]
    pub refresh_interval_seconds: u64,
}

fn default_page_size() -> u32 {
    100
}
fn default_max_pages() -> u32 {
    10
}
fn default_fungible_contract_type_id() -> u32 {
    2
}
fn default_batch_size() -> usize {
    5
}
fn default_batch_delay_ms() -> u64 {
    300
}
fn default_refresh_interval_seconds() -> u64 {
    3600
}

impl Default for Enrichment {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            fungible_contract_type_id: default_fungible_contract_type_id(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            refresh_interval_seconds: default_refresh_interval_seconds(),
        }
    }
}

/// SDK configuration, loaded from an optional `Config.toml` plus
/// environment overrides. Every section defaults to working values so the
/// library is usable (and testable) with no file present.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub pricing: Pricing,
    #[serde(default)]
    pub cache: Cache,
    #[serde(default)]
    pub enrichment: Enrichment,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("Config.toml").required(false))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // Environment variable overrides for endpoint configuration
        if let Ok(url) = env::var("CSPR_SDK_LAUNCH_CURVE_BASE_URL") {
            if !url.trim().is_empty() {
                settings.endpoints.launch_curve_base_url = url;
            }
        }
        if let Ok(url) = env::var("CSPR_SDK_LEDGER_BASE_URL") {
            if !url.trim().is_empty() {
                settings.endpoints.ledger_base_url = url;
            }
        }
        if let Ok(url) = env::var("CSPR_SDK_DEX_BASE_URL") {
            if !url.trim().is_empty() {
                settings.endpoints.dex_base_url = url;
            }
        }
        if let Ok(key) = env::var("CSPR_SDK_LEDGER_API_KEY") {
            if !key.trim().is_empty() {
                settings.endpoints.ledger_api_key = Some(key);
            }
        }
        if let Ok(raw) = env::var("CSPR_SDK_CATALOG_VERSION_KEY") {
            if !raw.trim().is_empty() {
                settings.cache.catalog_version_key = raw;
            }
        }

        Ok(settings)
    }
}
