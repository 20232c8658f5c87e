//! Reconciliation of classified lounge entries against the airport index
//!
//! Pure resolution, no I/O: a code pass first, then a similarity-ranked
//! name pass, then a flagged unresolved record. Runs inline in the worker
//! that classified the entry.

use tracing::debug;

use crate::airports::AirportIndex;
use crate::models::{AirportRef, ClassifiedEntry, MatchConfidence, ResolvedLoungeRecord};

/// Default acceptance threshold for name-based resolution
pub const DEFAULT_NAME_MATCH_THRESHOLD: f64 = 0.82;

/// Resolve one classified entry against the reference index.
///
/// Resolution order, first success wins:
/// 1. a well-formed 3- or 4-letter code token recognized by the index,
/// 2. a name-similarity match at or above `name_match_threshold`,
/// 3. a flagged unresolved record carrying no coordinates.
#[must_use]
pub fn resolve(
    entry: &ClassifiedEntry,
    index: &AirportIndex,
    name_match_threshold: f64,
) -> ResolvedLoungeRecord {
    for candidate in code_candidates(&entry.airport_identifier_text) {
        if let Some(airport) = index.lookup_by_code(&candidate) {
            debug!(
                "Resolved '{}' to {} via code {}",
                entry.facility_name, airport.code, candidate
            );
            return ResolvedLoungeRecord::resolved(airport, entry, MatchConfidence::ExactCode);
        }
    }

    let ranked = index.lookup_by_name(&entry.airport_identifier_text);
    if let Some(airport) = accept_name_match(&ranked, entry, name_match_threshold) {
        debug!(
            "Resolved '{}' to {} via name match",
            entry.facility_name, airport.code
        );
        return ResolvedLoungeRecord::resolved(airport, entry, MatchConfidence::NameMatch);
    }

    debug!(
        "Could not resolve '{}' (identifier: '{}')",
        entry.facility_name, entry.airport_identifier_text
    );
    ResolvedLoungeRecord::unresolved(entry)
}

/// Code tokens worth trying against the index: tokens that already appear
/// fully uppercase in the identifier text, 3 or 4 letters long. Lowercase
/// words are never treated as codes, so free text like "Paris Charles de
/// Gaulle" goes to the name pass instead of colliding with real IATA
/// assignments.
fn code_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    for token in text.split(|c: char| !c.is_ascii_alphanumeric()) {
        if (3..=4).contains(&token.len())
            && token.chars().all(|c| c.is_ascii_uppercase())
            && !candidates.iter().any(|c| c == token)
        {
            candidates.push(token.to_string());
        }
    }
    candidates
}

/// Apply the acceptance threshold and the tie-break policy to a ranked
/// candidate list.
///
/// Among candidates tied at the top score: prefer one whose country matches
/// the entry's region hint; if still tied, the lexicographically smallest
/// code wins so output is reproducible across runs.
fn accept_name_match<'a>(
    ranked: &[(&'a AirportRef, f64)],
    entry: &ClassifiedEntry,
    threshold: f64,
) -> Option<&'a AirportRef> {
    let (_, top_score) = ranked.first()?;
    if *top_score < threshold {
        return None;
    }

    let tied: Vec<&AirportRef> = ranked
        .iter()
        .take_while(|(_, score)| score == top_score)
        .map(|(airport, _)| *airport)
        .collect();

    if let Some(hint) = &entry.region_hint {
        if let Some(airport) = tied.iter().find(|a| region_matches(a, hint)) {
            return Some(*airport);
        }
    }

    // `ranked` orders equal scores by code, so the first tie is the
    // lexicographically smallest.
    tied.first().copied()
}

/// A region hint matches when it names the candidate's ISO country code.
/// Hints that are country-name slugs fall through to the code tie-break.
fn region_matches(airport: &AirportRef, hint: &str) -> bool {
    hint.trim().eq_ignore_ascii_case(&airport.country)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FacilityCategory;

    fn entry(identifier: &str, hint: Option<&str>) -> ClassifiedEntry {
        ClassifiedEntry {
            airport_identifier_text: identifier.to_string(),
            facility_name: "Test Lounge".to_string(),
            category: FacilityCategory::Lounge,
            terminal: None,
            hours: None,
            detail_slug: "test-lounge".to_string(),
            region_hint: hint.map(str::to_string),
        }
    }

    fn sample_index() -> AirportIndex {
        AirportIndex::build(vec![
            AirportRef::new("LHR", "London Heathrow Airport", "GB", 51.47, -0.45)
                .with_icao("EGLL")
                .with_city("London"),
            AirportRef::new("CDG", "Charles de Gaulle International Airport", "FR", 49.01, 2.55)
                .with_icao("LFPG")
                .with_city("Paris"),
        ])
    }

    #[test]
    fn test_resolve_by_exact_code() {
        let index = sample_index();
        let record = resolve(&entry("LHR London Heathrow", None), &index, 0.82);
        assert_eq!(record.confidence, MatchConfidence::ExactCode);
        assert_eq!(record.airport_code.as_deref(), Some("LHR"));
        assert!(record.coordinates.is_some());
    }

    #[test]
    fn test_resolve_by_icao_code() {
        let index = sample_index();
        let record = resolve(&entry("EGLL somewhere", None), &index, 0.82);
        assert_eq!(record.confidence, MatchConfidence::ExactCode);
        assert_eq!(record.airport_code.as_deref(), Some("LHR"));
    }

    #[test]
    fn test_resolve_by_name_match() {
        let index = sample_index();
        let record = resolve(&entry("Paris Charles de Gaulle", None), &index, 0.82);
        assert_eq!(record.confidence, MatchConfidence::NameMatch);
        assert_eq!(record.airport_code.as_deref(), Some("CDG"));
    }

    #[test]
    fn test_unresolvable_entry_is_flagged() {
        let index = sample_index();
        let record = resolve(&entry("Somewhere Else Entirely", None), &index, 0.82);
        assert_eq!(record.confidence, MatchConfidence::Unresolved);
        assert!(record.coordinates.is_none());
        assert!(record.airport_code.is_none());
    }

    #[test]
    fn test_lowercase_words_are_not_code_candidates() {
        assert_eq!(
            code_candidates("LHR the best airport"),
            vec!["LHR".to_string()]
        );
        assert!(code_candidates("Paris Charles de Gaulle").is_empty());
        assert_eq!(code_candidates("EGLL and LHR"), vec!["EGLL", "LHR"]);
    }

    #[test]
    fn test_tie_break_prefers_region_hint() {
        let index = AirportIndex::build(vec![
            AirportRef::new("AAA", "Twin City Airport", "AA", 1.0, 1.0),
            AirportRef::new("BBB", "Twin City Airport", "BB", 2.0, 2.0),
        ]);
        let record = resolve(&entry("Twin City", Some("bb")), &index, 0.82);
        assert_eq!(record.airport_code.as_deref(), Some("BBB"));
    }

    #[test]
    fn test_tie_break_is_deterministic_without_hint() {
        let index = AirportIndex::build(vec![
            AirportRef::new("BBB", "Twin City Airport", "AA", 1.0, 1.0),
            AirportRef::new("AAA", "Twin City Airport", "AA", 2.0, 2.0),
        ]);
        for _ in 0..10 {
            let record = resolve(&entry("Twin City", None), &index, 0.82);
            assert_eq!(record.airport_code.as_deref(), Some("AAA"));
        }
    }

    #[test]
    fn test_threshold_rejects_weak_matches() {
        let index = sample_index();
        // Similar enough to rank, not enough to accept.
        let record = resolve(&entry("London Gateway", None), &index, 0.95);
        assert_eq!(record.confidence, MatchConfidence::Unresolved);
    }
}
