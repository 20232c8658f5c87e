//! Listing model: raw pages, classified entries, resolved records and the
//! aggregated per-airport map entries

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::airport::Coordinates;

/// One item of the fetch work list: a single airport page on the listing
/// source, identified by its canonical URL and path slugs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingTarget {
    pub url: String,
    pub country_slug: String,
    pub airport_slug: String,
}

/// An unparsed unit of source data: the page body plus provenance.
///
/// Produced by the fetcher, consumed and discarded by the classifier.
#[derive(Debug, Clone)]
pub struct RawListing {
    pub body: String,
    pub source_url: String,
    pub country_slug: String,
    pub airport_slug: String,
}

/// Facility category recognized by the classifier keyword taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityCategory {
    Lounge,
    Dining,
    Relaxation,
    Other,
}

/// A typed listing entry, classified but not yet resolved to an airport.
///
/// Only `Lounge` entries proceed to reconciliation; the rest are counted
/// and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEntry {
    /// Free-text airport identifier (code candidates and/or display name)
    pub airport_identifier_text: String,
    pub facility_name: String,
    pub category: FacilityCategory,
    pub terminal: Option<String>,
    pub hours: Option<String>,
    /// Detail-page slug, the dedupe key within one airport page
    pub detail_slug: String,
    /// Country slug from the source URL, used as a resolution tie-break hint
    pub region_hint: Option<String>,
}

/// How a lounge entry was resolved against the reference index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    ExactCode,
    NameMatch,
    Unresolved,
}

/// Outcome of reconciling one classified lounge entry.
///
/// `Unresolved` records carry no usable coordinates; they are excluded from
/// the map and kept in the diagnostics list instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLoungeRecord {
    pub airport_code: Option<String>,
    pub airport_name: Option<String>,
    pub airport_country: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub facility_name: String,
    pub terminal: Option<String>,
    /// The identifier text the reconciler worked from, kept for diagnostics
    pub identifier_text: String,
    pub confidence: MatchConfidence,
}

impl ResolvedLoungeRecord {
    /// Build a coordinate-bearing record from a reference table hit
    #[must_use]
    pub fn resolved(
        airport: &super::airport::AirportRef,
        entry: &ClassifiedEntry,
        confidence: MatchConfidence,
    ) -> Self {
        Self {
            airport_code: Some(airport.code.clone()),
            airport_name: Some(airport.name.clone()),
            airport_country: Some(airport.country.clone()),
            coordinates: Some(airport.coordinates),
            facility_name: entry.facility_name.clone(),
            terminal: entry.terminal.clone(),
            identifier_text: entry.airport_identifier_text.clone(),
            confidence,
        }
    }

    /// Build a flagged record for an entry that could not be matched
    #[must_use]
    pub fn unresolved(entry: &ClassifiedEntry) -> Self {
        Self {
            airport_code: None,
            airport_name: None,
            airport_country: None,
            coordinates: None,
            facility_name: entry.facility_name.clone(),
            terminal: entry.terminal.clone(),
            identifier_text: entry.airport_identifier_text.clone(),
            confidence: MatchConfidence::Unresolved,
        }
    }

    /// True when the record carries coordinates usable for the map
    #[must_use]
    pub fn is_mappable(&self) -> bool {
        self.confidence != MatchConfidence::Unresolved
            && self.airport_code.is_some()
            && self.coordinates.is_some()
    }
}

/// Final aggregate: one map entry per lounge-enabled airport.
///
/// The lounge-name set only grows within a run; `lounge_count` is derived
/// from it, so duplicate submissions can never inflate the count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportMapEntry {
    pub airport_code: String,
    pub airport_name: String,
    pub country: String,
    pub coordinates: Coordinates,
    pub lounge_names: BTreeSet<String>,
}

impl AirportMapEntry {
    #[must_use]
    pub fn new(record: &ResolvedLoungeRecord) -> Option<Self> {
        Some(Self {
            airport_code: record.airport_code.clone()?,
            airport_name: record.airport_name.clone().unwrap_or_default(),
            country: record.airport_country.clone().unwrap_or_default(),
            coordinates: record.coordinates?,
            lounge_names: BTreeSet::new(),
        })
    }

    /// Number of distinct lounges confirmed at this airport
    #[must_use]
    pub fn lounge_count(&self) -> usize {
        self.lounge_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::airport::AirportRef;

    fn lounge_entry(name: &str) -> ClassifiedEntry {
        ClassifiedEntry {
            airport_identifier_text: "LHR London Heathrow".to_string(),
            facility_name: name.to_string(),
            category: FacilityCategory::Lounge,
            terminal: Some("Terminal 5".to_string()),
            hours: None,
            detail_slug: "lhr15-no1-lounge".to_string(),
            region_hint: Some("united-kingdom".to_string()),
        }
    }

    #[test]
    fn test_resolved_record_carries_airport_metadata() {
        let airport = AirportRef::new("LHR", "London Heathrow", "GB", 51.47, -0.45);
        let record = ResolvedLoungeRecord::resolved(
            &airport,
            &lounge_entry("No1 Lounge"),
            MatchConfidence::ExactCode,
        );
        assert_eq!(record.airport_code.as_deref(), Some("LHR"));
        assert_eq!(record.coordinates, Some(Coordinates::new(51.47, -0.45)));
        assert!(record.is_mappable());
    }

    #[test]
    fn test_unresolved_record_has_no_coordinates() {
        let record = ResolvedLoungeRecord::unresolved(&lounge_entry("Mystery Lounge"));
        assert_eq!(record.confidence, MatchConfidence::Unresolved);
        assert!(record.coordinates.is_none());
        assert!(!record.is_mappable());
    }

    #[test]
    fn test_map_entry_count_tracks_name_set() {
        let airport = AirportRef::new("LHR", "London Heathrow", "GB", 51.47, -0.45);
        let record = ResolvedLoungeRecord::resolved(
            &airport,
            &lounge_entry("No1 Lounge"),
            MatchConfidence::ExactCode,
        );
        let mut entry = AirportMapEntry::new(&record).unwrap();
        entry.lounge_names.insert("No1 Lounge".to_string());
        entry.lounge_names.insert("No1 Lounge".to_string());
        assert_eq!(entry.lounge_count(), 1);
    }
}
