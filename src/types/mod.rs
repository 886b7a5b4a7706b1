/// Resolved token records, reserve snapshots, and source metadata
pub mod market;

pub use market::{
    Confidence, Field, LifecycleStage, ReserveSnapshot, SocialLinks, SourceId, TokenContribution,
    TokenRecord,
};
