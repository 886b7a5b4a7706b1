// src/adapters/catalog.rs
//
// Adapter over the process-lifetime enriched catalog. Supplies base
// identity fields for tokens the launch platform does not know about. The
// tier itself is built elsewhere (catalog builder / list_all); resolution
// only consults whatever the tier currently holds.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::CatalogCache;
use crate::identifier::TokenIdentifier;
use crate::source_adapter::{Outcome, SourceAdapter};
use crate::types::{SourceId, TokenContribution};

pub struct CatalogAdapter {
    catalog: Arc<CatalogCache>,
}

impl CatalogAdapter {
    pub fn new(catalog: Arc<CatalogCache>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl SourceAdapter for CatalogAdapter {
    fn source(&self) -> SourceId {
        SourceId::Catalog
    }

    async fn resolve(&self, identifier: &TokenIdentifier) -> Outcome {
        let record = match self.catalog.lookup(identifier) {
            Some(record) => record,
            None => return Outcome::NotFound,
        };

        // Placeholder entries carry no identity worth contributing.
        if record.is_placeholder() {
            return Outcome::NotFound;
        }

        Outcome::Found(TokenContribution {
            name: Some(record.name),
            symbol: Some(record.symbol),
            logo_url: record.logo_url,
            description: record.description,
            decimals: Some(record.decimals),
            total_supply: Some(record.total_supply),
            owner_key: record.owner_key,
            created_at: record.created_at,
            ..TokenContribution::new(SourceId::Catalog)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenRecord;

    const HASH: &str = "40bd4a45c414df61be3832e28ff6dcedc479744707c611fd97fea0d90619146f";

    #[tokio::test]
    async fn test_resolves_from_catalog_tier() {
        let cache = Arc::new(CatalogCache::new("v1"));
        let mut record = TokenRecord::placeholder(TokenIdentifier::new(HASH));
        record.name = "Catalog Token".to_string();
        record.field_provenance.insert(
            crate::types::Field::Name,
            crate::merge::priority(
                SourceId::Catalog,
                crate::types::Confidence::Authoritative,
                crate::types::Field::Name,
                crate::types::LifecycleStage::PreListing,
            ),
        );
        cache.upsert(record);

        let adapter = CatalogAdapter::new(cache.clone());
        let outcome = adapter.resolve(&TokenIdentifier::new(HASH)).await;
        let contribution = outcome.into_contribution().expect("found");
        assert_eq!(contribution.name.as_deref(), Some("Catalog Token"));

        let missing = adapter
            .resolve(&TokenIdentifier::new("deadbeefdeadbeefdead"))
            .await;
        assert!(missing.into_contribution().is_none());
    }
}
