//! # CSPR Market SDK
//!
//! A Rust library for priority-ordered token market-data resolution on the
//! Casper network. Given a token identifier, the SDK produces one
//! consistent, current view of the token's identity, price, market cap,
//! liquidity, volume, and lifecycle stage by consulting four independent,
//! mutually inconsistent upstream providers.
//!
//! ## Overview
//!
//! The providers disagree on identifier formats, units, coverage, and
//! freshness. The SDK reconciles them with:
//!
//! - **Normalization**: one canonical identifier form for every comparison
//! - **Priority-ordered adapters**: launch curve, enriched catalog, ledger
//!   stats, DEX pair — each with partial coverage, none trusted blindly
//! - **Provenance-ranked merging**: a lower-priority source never
//!   overwrites a field a higher-priority source supplied
//! - **Stage-aware pricing**: one ratio formula, applied to whichever
//!   reserve snapshot is authoritative for the token's lifecycle stage
//!
//! ## Architecture
//!
//! ### Resolution Layer
//! The orchestrator normalizes the identifier, drives the adapters
//! concurrently, and commits their results in strict priority order.
//!
//! ### Computation Layer
//! Pure functions turn reserve snapshots into price, market cap, and
//! liquidity figures; a one-way detector tracks bonding-curve graduation.
//!
//! ### Cache Layer
//! A short-TTL tier for the launch-curve catalog snapshot and a
//! process-lifetime, version-keyed tier for the enriched full catalog.

// Core Types
/// Token identifier canonicalization
pub mod identifier;
/// Resolved records, snapshots, and source metadata
pub mod types;
/// Trait for upstream provider adapters
pub mod source_adapter;
/// Adapter failure taxonomy
pub mod errors;

// Source Adapters
/// Provider-specific adapters (launch curve, catalog, ledger, DEX pair)
pub mod adapters;

// Resolution Layer
/// Provenance-ranked reconciliation of adapter contributions
pub mod merge;
/// Main resolution orchestrator
pub mod orchestrator;

// Computation Layer
/// Pure price/market-cap/liquidity computation
pub mod price_engine;
/// One-way lifecycle stage detection
pub mod graduation;

// Cache & Catalog
/// Two-tier caching (short-TTL snapshot, process-lifetime catalog)
pub mod cache;
/// Batch enrichment of the full token catalog
pub mod catalog_builder;

// Infrastructure
/// Shared HTTP plumbing (typed GET, bounded retries)
pub mod http;
/// CSPR/USD exchange rate feed
pub mod native_price;
/// Metrics and observability
pub mod metrics;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use identifier::TokenIdentifier;
pub use orchestrator::ResolutionOrchestrator;
pub use settings::Settings;
pub use source_adapter::SourceAdapter;
pub use types::{LifecycleStage, ReserveSnapshot, TokenRecord};
