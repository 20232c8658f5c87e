//! Aggregation of resolved records into the final per-airport mapping
//!
//! The merge is commutative and idempotent per (airport code, facility
//! name): multiple source pages redundantly listing the same facility
//! collapse to one entry, and submission order never changes the result.
//! Works incrementally while the pipeline streams, or in one batch.

use std::collections::BTreeMap;

use crate::models::{AirportMapEntry, ResolvedLoungeRecord};

/// Result of a completed aggregation
#[derive(Debug, Default, PartialEq)]
pub struct AggregateOutcome {
    /// One entry per lounge-enabled airport, keyed by code
    pub airports: BTreeMap<String, AirportMapEntry>,
    /// Records excluded from the map, kept for operator review
    pub unresolved: Vec<ResolvedLoungeRecord>,
}

/// Accumulates resolved records into a deduplicated, airport-keyed set
#[derive(Debug, Default)]
pub struct LoungeAggregator {
    airports: BTreeMap<String, AirportMapEntry>,
    unresolved: Vec<ResolvedLoungeRecord>,
}

impl LoungeAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one resolved record into the mapping.
    ///
    /// Unresolved records (or records missing usable coordinates) go to the
    /// diagnostics list; resolved records insert into the name set of their
    /// airport entry, which only ever grows.
    pub fn insert(&mut self, record: ResolvedLoungeRecord) {
        if !record.is_mappable() {
            self.unresolved.push(record);
            return;
        }
        let Some(new_entry) = AirportMapEntry::new(&record) else {
            self.unresolved.push(record);
            return;
        };

        let code = new_entry.airport_code.clone();
        let entry = self.airports.entry(code).or_insert(new_entry);
        entry.lounge_names.insert(record.facility_name);
    }

    /// Merge a whole batch of records
    pub fn merge(records: impl IntoIterator<Item = ResolvedLoungeRecord>) -> AggregateOutcome {
        let mut aggregator = Self::new();
        for record in records {
            aggregator.insert(record);
        }
        aggregator.finish()
    }

    /// Number of lounge-enabled airports accumulated so far
    #[must_use]
    pub fn airport_count(&self) -> usize {
        self.airports.len()
    }

    /// Finalize the mapping
    #[must_use]
    pub fn finish(self) -> AggregateOutcome {
        AggregateOutcome {
            airports: self.airports,
            unresolved: self.unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AirportRef, ClassifiedEntry, FacilityCategory, MatchConfidence};

    fn record(code: &str, facility: &str) -> ResolvedLoungeRecord {
        let airport = AirportRef::new(code, &format!("{code} Airport"), "XX", 10.0, 20.0);
        let entry = ClassifiedEntry {
            airport_identifier_text: code.to_string(),
            facility_name: facility.to_string(),
            category: FacilityCategory::Lounge,
            terminal: None,
            hours: None,
            detail_slug: facility.to_lowercase().replace(' ', "-"),
            region_hint: None,
        };
        ResolvedLoungeRecord::resolved(&airport, &entry, MatchConfidence::ExactCode)
    }

    fn unresolved_record(facility: &str) -> ResolvedLoungeRecord {
        let entry = ClassifiedEntry {
            airport_identifier_text: "nowhere".to_string(),
            facility_name: facility.to_string(),
            category: FacilityCategory::Lounge,
            terminal: None,
            hours: None,
            detail_slug: "nowhere".to_string(),
            region_hint: None,
        };
        ResolvedLoungeRecord::unresolved(&entry)
    }

    #[test]
    fn test_merge_groups_by_airport() {
        let outcome = LoungeAggregator::merge(vec![
            record("LHR", "No1 Lounge"),
            record("LHR", "Plaza Premium"),
            record("CDG", "Star Alliance Lounge"),
        ]);

        assert_eq!(outcome.airports.len(), 2);
        assert_eq!(outcome.airports["LHR"].lounge_count(), 2);
        assert_eq!(outcome.airports["CDG"].lounge_count(), 1);
        assert!(outcome.unresolved.is_empty());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let records = vec![
            record("LHR", "No1 Lounge"),
            record("LHR", "Plaza Premium"),
            record("CDG", "Star Alliance Lounge"),
        ];
        let mut doubled = records.clone();
        doubled.extend(records.clone());

        assert_eq!(
            LoungeAggregator::merge(records),
            LoungeAggregator::merge(doubled)
        );
    }

    #[test]
    fn test_merge_is_commutative() {
        let records = vec![
            record("LHR", "No1 Lounge"),
            record("CDG", "Star Alliance Lounge"),
            record("LHR", "Plaza Premium"),
            unresolved_record("Mystery Lounge"),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let forward = LoungeAggregator::merge(records);
        let backward = LoungeAggregator::merge(reversed);
        assert_eq!(forward.airports, backward.airports);
        assert_eq!(forward.unresolved.len(), backward.unresolved.len());
    }

    #[test]
    fn test_incremental_matches_batch() {
        let records = vec![
            record("LHR", "No1 Lounge"),
            record("CDG", "Star Alliance Lounge"),
            record("LHR", "No1 Lounge"),
        ];

        let mut incremental = LoungeAggregator::new();
        for r in records.clone() {
            incremental.insert(r);
        }

        assert_eq!(incremental.finish(), LoungeAggregator::merge(records));
    }

    #[test]
    fn test_unresolved_records_excluded_from_map() {
        let outcome = LoungeAggregator::merge(vec![
            record("LHR", "No1 Lounge"),
            unresolved_record("Mystery Lounge"),
        ]);

        assert_eq!(outcome.airports.len(), 1);
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.unresolved[0].facility_name, "Mystery Lounge");
    }
}
