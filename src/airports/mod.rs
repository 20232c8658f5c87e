//! Airport reference dataset
//!
//! This module loads the canonical airport table (OurAirports CSV layout)
//! and indexes it for exact code lookup and similarity-ranked name lookup.
//! The index is read-only after load and safe to share across workers.

pub mod index;
pub mod loader;

// Re-export commonly used types from submodules
pub use index::AirportIndex;
pub use loader::{OURAIRPORTS_CSV_URL, load_reference_file, parse_reference};
