//! Airport index for exact code lookup and fuzzy name lookup.

use std::collections::HashMap;

use tracing::info;

use crate::models::AirportRef;

/// Floor below which name candidates are not reported at all. The
/// acceptance threshold applied by the reconciler is configured separately
/// and sits well above this.
pub const MIN_NAME_SIMILARITY: f64 = 0.5;

/// Generic tokens stripped from airport names before similarity scoring.
/// Listings rarely spell these out, and they drown the distinctive part of
/// the name in edit distance.
const GENERIC_TOKENS: [&str; 6] = [
    "airport",
    "international",
    "intl",
    "airfield",
    "aerodrome",
    "regional",
];

/// Index of the airport reference table.
///
/// Supports O(1) case-insensitive code lookup (IATA and ICAO idents) and
/// similarity-ranked lookup by free-text name. Read-only after build.
#[derive(Debug)]
pub struct AirportIndex {
    airports: Vec<AirportRef>,
    by_code: HashMap<String, usize>,
    /// Normalized name variants per airport: (variant, airport position)
    name_keys: Vec<(String, usize)>,
}

impl AirportIndex {
    /// Build the index from loaded reference rows.
    pub fn build(airports: Vec<AirportRef>) -> Self {
        let mut by_code = HashMap::new();
        let mut name_keys = Vec::new();

        for (position, airport) in airports.iter().enumerate() {
            by_code.entry(airport.code.clone()).or_insert(position);
            if let Some(icao) = &airport.icao {
                by_code.entry(icao.clone()).or_insert(position);
            }

            for variant in name_variants(airport) {
                name_keys.push((variant, position));
            }
        }

        info!(count = airports.len(), "Built airport index");

        Self {
            airports,
            by_code,
            name_keys,
        }
    }

    /// Get an airport by IATA or ICAO code, case-insensitive.
    ///
    /// Returns `None` if the code is unknown.
    pub fn lookup_by_code(&self, code: &str) -> Option<&AirportRef> {
        self.by_code
            .get(&code.trim().to_uppercase())
            .map(|&position| &self.airports[position])
    }

    /// Rank airports by similarity to a free-text name fragment.
    ///
    /// Candidates are ordered best match first; ties are ordered by code so
    /// the ranking is stable across runs. Empty when nothing scores above
    /// [`MIN_NAME_SIMILARITY`].
    pub fn lookup_by_name(&self, text: &str) -> Vec<(&AirportRef, f64)> {
        let Some(query) = normalize_key(text) else {
            return Vec::new();
        };

        let mut best: HashMap<usize, f64> = HashMap::new();
        for (variant, position) in &self.name_keys {
            let score = similarity(&query, variant);
            if score < MIN_NAME_SIMILARITY {
                continue;
            }
            let entry = best.entry(*position).or_insert(0.0);
            if score > *entry {
                *entry = score;
            }
        }

        let mut ranked: Vec<(&AirportRef, f64)> = best
            .into_iter()
            .map(|(position, score)| (&self.airports[position], score))
            .collect();
        ranked.sort_by(|(a, sa), (b, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.code.cmp(&b.code))
        });
        ranked
    }

    /// Returns the number of airports in the index.
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    /// Returns an iterator over all airports.
    pub fn iter(&self) -> impl Iterator<Item = &AirportRef> {
        self.airports.iter()
    }
}

/// Normalized lookup keys for one airport: name, city, and "city name",
/// each with generic tokens stripped.
fn name_variants(airport: &AirportRef) -> Vec<String> {
    let mut variants = Vec::new();
    let mut push = |text: Option<String>| {
        if let Some(text) = text {
            if !variants.contains(&text) {
                variants.push(text);
            }
        }
    };

    push(normalize_key(&airport.name));
    if let Some(city) = &airport.city {
        push(normalize_key(city));
        push(normalize_key(&format!("{city} {}", airport.name)));
    }
    variants
}

/// Lowercase, reduce to alphanumeric tokens, and drop generic airport
/// vocabulary. Falls back to the unstripped form when stripping would leave
/// nothing, and `None` for text with no tokens at all.
fn normalize_key(text: &str) -> Option<String> {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let stripped: Vec<&str> = tokens
        .iter()
        .filter(|t| !GENERIC_TOKENS.contains(&**t))
        .copied()
        .collect();
    if stripped.is_empty() {
        Some(tokens.join(" "))
    } else {
        Some(stripped.join(" "))
    }
}

/// Normalized similarity in [0, 1]: 1 minus the Levenshtein distance over
/// the longer length.
fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let longest = a_chars.len().max(b_chars.len());
    if longest == 0 {
        return 1.0;
    }

    // Cheap bound: the distance is at least the length difference.
    let length_gap = a_chars.len().abs_diff(b_chars.len());
    if 1.0 - (length_gap as f64 / longest as f64) < MIN_NAME_SIMILARITY {
        return 0.0;
    }

    1.0 - (levenshtein(&a_chars, &b_chars) as f64 / longest as f64)
}

/// Levenshtein edit distance, two-row dynamic programming.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> AirportIndex {
        AirportIndex::build(vec![
            AirportRef::new("LHR", "London Heathrow Airport", "GB", 51.47, -0.45)
                .with_icao("EGLL")
                .with_city("London"),
            AirportRef::new("CDG", "Charles de Gaulle International Airport", "FR", 49.01, 2.55)
                .with_icao("LFPG")
                .with_city("Paris"),
            AirportRef::new("LAX", "Los Angeles International Airport", "US", 33.94, -118.41)
                .with_icao("KLAX")
                .with_city("Los Angeles"),
        ])
    }

    #[test]
    fn test_lookup_by_code_case_insensitive() {
        let index = sample_index();
        assert_eq!(
            index.lookup_by_code("lax").map(|a| a.code.as_str()),
            index.lookup_by_code("LAX").map(|a| a.code.as_str())
        );
        assert!(index.lookup_by_code("LaX").is_some());
        assert!(index.lookup_by_code("XXX").is_none());
    }

    #[test]
    fn test_lookup_by_icao_ident() {
        let index = sample_index();
        let airport = index.lookup_by_code("egll").unwrap();
        assert_eq!(airport.code, "LHR");
    }

    #[test]
    fn test_lookup_by_name_ranks_best_first() {
        let index = sample_index();
        let ranked = index.lookup_by_name("Paris Charles de Gaulle");
        assert!(!ranked.is_empty());
        let (airport, score) = ranked[0];
        assert_eq!(airport.code, "CDG");
        assert!(score > 0.9, "expected a near-exact match, got {score}");
    }

    #[test]
    fn test_lookup_by_name_empty_below_floor() {
        let index = sample_index();
        assert!(index.lookup_by_name("completely unrelated text").is_empty());
        assert!(index.lookup_by_name("???").is_empty());
    }

    #[test]
    fn test_tied_scores_order_by_code() {
        let index = AirportIndex::build(vec![
            AirportRef::new("BBB", "Twin City Airport", "AA", 1.0, 1.0),
            AirportRef::new("AAA", "Twin City Airport", "AA", 2.0, 2.0),
        ]);
        for _ in 0..5 {
            let ranked = index.lookup_by_name("Twin City");
            assert_eq!(ranked[0].0.code, "AAA");
            assert_eq!(ranked[1].0.code, "BBB");
        }
    }

    #[test]
    fn test_levenshtein_basics() {
        let a: Vec<char> = "kitten".chars().collect();
        let b: Vec<char> = "sitting".chars().collect();
        assert_eq!(levenshtein(&a, &b), 3);
        assert_eq!(levenshtein(&a, &a), 0);
        assert_eq!(levenshtein(&[], &b), 7);
    }

    #[test]
    fn test_normalize_key_strips_generic_tokens() {
        assert_eq!(
            normalize_key("Charles de Gaulle International Airport").as_deref(),
            Some("charles de gaulle")
        );
        // Stripping everything falls back to the unstripped form.
        assert_eq!(
            normalize_key("International Airport").as_deref(),
            Some("international airport")
        );
        assert_eq!(normalize_key("  ...  "), None);
    }
}
