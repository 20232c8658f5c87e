//! Core data model for the lounge map pipeline
//!
//! This module provides the value types flowing through the pipeline:
//! airport reference rows, raw and classified listings, resolved lounge
//! records, and the aggregated per-airport map entries.

pub mod airport;
pub mod listing;

// Re-export commonly used types from submodules
pub use airport::{AirportRef, Coordinates};
pub use listing::{
    AirportMapEntry, ClassifiedEntry, FacilityCategory, ListingTarget, MatchConfidence,
    RawListing, ResolvedLoungeRecord,
};
