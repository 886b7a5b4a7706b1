//! # Source Adapter Trait
//!
//! This module defines the core abstraction for integrating upstream market
//! data providers into the CSPR Market SDK. The `SourceAdapter` trait
//! provides a unified interface for resolving a token identifier against
//! one provider, so the orchestrator can drive all providers through a
//! single priority-ordered pipeline.
//!
//! ## Overview
//!
//! The adapter pattern keeps provider quirks (identifier formats, units,
//! partial coverage) out of the resolution core. Each provider implements
//! `SourceAdapter`; adding or reordering a provider is a data change in the
//! orchestrator's adapter list, not a control-flow rewrite.
//!
//! ## Adding a New Provider
//!
//! 1. Implement the `SourceAdapter` trait for your provider
//! 2. Add a `SourceId` variant and its priority rows (see `merge.rs`)
//! 3. Register the adapter in the `ResolutionOrchestrator`
//!
//! ## Failure Semantics
//!
//! Adapters never propagate errors: network failures, timeouts, and
//! malformed responses are caught locally, logged, and converted to
//! `Outcome::NotFound`. A failure in one adapter never blocks another.

use async_trait::async_trait;

use crate::identifier::TokenIdentifier;
use crate::types::{SourceId, TokenContribution};

/// Result of one adapter's resolution attempt.
///
/// `NotFound` is a normal, expected outcome (partial coverage), and is also
/// what every internal failure degrades to.
#[derive(Debug, Clone)]
pub enum Outcome {
    Found(TokenContribution),
    NotFound,
}

impl Outcome {
    pub fn into_contribution(self) -> Option<TokenContribution> {
        match self {
            Outcome::Found(c) => Some(c),
            Outcome::NotFound => None,
        }
    }
}

/// The main trait for all upstream provider adapters.
///
/// # Thread Safety
///
/// All adapters must be `Send + Sync`: the orchestrator starts them
/// concurrently as independent futures.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which provider this adapter fronts. Used for logging, metrics, and
    /// merge priorities.
    fn source(&self) -> SourceId;

    /// Resolve one canonical identifier against this provider.
    ///
    /// Returns `Outcome::Found` with whatever subset of fields the provider
    /// supplies, or `Outcome::NotFound` when the provider has no matching
    /// entry or is unreachable. Must not panic and must not return an
    /// error; the orchestrator treats a timeout identically to `NotFound`.
    async fn resolve(&self, identifier: &TokenIdentifier) -> Outcome;
}
