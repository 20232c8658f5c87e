//! `LoungeMap` - Priority Pass lounge collection and airport map building
//!
//! This library provides the core acquisition-and-reconciliation pipeline:
//! concurrent retrieval of lounge listings, classification of entries,
//! matching against the worldwide airport reference table, deduplication
//! into a per-airport record set, and rendering of the interactive map.

pub mod aggregate;
pub mod airports;
pub mod cache;
pub mod config;
pub mod emitter;
pub mod error;
pub mod listings;
pub mod models;
pub mod pipeline;
pub mod reconcile;

// Re-export core types for public API
pub use aggregate::{AggregateOutcome, LoungeAggregator};
pub use airports::AirportIndex;
pub use cache::PageCache;
pub use config::LoungeMapConfig;
pub use error::LoungeMapError;
pub use listings::{ListingSource, PriorityPassClient};
pub use models::{
    AirportMapEntry, AirportRef, ClassifiedEntry, Coordinates, FacilityCategory, ListingTarget,
    MatchConfidence, RawListing, ResolvedLoungeRecord,
};
pub use pipeline::{PipelineOptions, PipelineOutcome, RunStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, LoungeMapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
