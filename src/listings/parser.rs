//! Listing page classifier
//!
//! Pure parsing of listing-source pages, no I/O. An airport page yields
//! facility entries through two extraction paths: server-rendered anchor
//! cards, and serialized JSON fragments embedded in the page source (the
//! source only renders the first terminal tab as cards; the remaining tabs
//! exist solely in the embedded payload). Results from both paths are merged
//! and deduplicated by (category, detail slug).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::LoungeMapError;
use crate::models::{ClassifiedEntry, FacilityCategory, ListingTarget, RawListing};
use crate::Result;

/// Category tokens indicating lounge access
const LOUNGE_KEYWORDS: [&str; 1] = ["lounge"];
/// Category tokens indicating food and drink outlets
const DINING_KEYWORDS: [&str; 5] = ["dining", "restaurant", "bar", "cafe", "eatery"];
/// Category tokens indicating rest and wellness outlets
const RELAXATION_KEYWORDS: [&str; 4] = ["relax", "spa", "sleep", "rest"];

/// Facility objects serialized into the page source. Handles both plain
/// JSON and backslash-escaped JSON string fragments.
static EMBEDDED_PAYLOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?si)(?:\\?"code\\?":\\?"(?P<code>[A-Z0-9]{3,6})\\?",)?\\?"name\\?":\\?"(?P<name>[^"\\]+)\\?",\\?"outletCategory\\?":\\?"(?P<category>LOUNGE|DINING|RELAX)\\?",\\?"slug\\?":\\?"(?P<slug>[a-z0-9-]+)\\?".{0,1200}?\\?"terminal\\?":\\?"(?P<terminal>[^"\\]+)\\?"(?:.{0,200}?\\?"openingHours\\?":\\?"(?P<hours>[^"\\]+)\\?")?"#,
    )
    .expect("embedded payload pattern is valid")
});

/// Page titles carry the IATA code as "<CODE> Lounges"
static TITLE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{3})\s+LOUNGES\b").expect("title pattern is valid"));

/// Classify a category text against the fixed keyword taxonomy.
///
/// Fail-closed: text matching no lounge keyword is never classified as
/// `Lounge`; unmatched text falls through to `Other` and is dropped by the
/// pipeline with a diagnostic count.
#[must_use]
pub fn classify_category(text: &str) -> FacilityCategory {
    let lowered = text.to_lowercase();
    if LOUNGE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        FacilityCategory::Lounge
    } else if DINING_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        FacilityCategory::Dining
    } else if RELAXATION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        FacilityCategory::Relaxation
    } else {
        FacilityCategory::Other
    }
}

/// Extract the per-airport page work list from the source's index page.
///
/// Airport pages are anchors of the form `/lounges/<country>/<airport>`,
/// exactly those path segments. Returns a sorted, deduplicated list.
#[must_use]
pub fn extract_airport_targets(index_html: &str, base_url: &str) -> Vec<ListingTarget> {
    let document = Html::parse_document(index_html);
    let anchor_selector = Selector::parse("a[href]").expect("anchor selector is valid");
    let base = base_url.trim_end_matches('/');

    let mut targets = std::collections::BTreeSet::new();
    for anchor in document.select(&anchor_selector) {
        let href = anchor.value().attr("href").unwrap_or("").trim();
        if !href.starts_with("/lounges/")
            || href.matches('/').count() != 3
            || href.ends_with('/')
        {
            continue;
        }
        let mut segments = href.trim_start_matches('/').split('/');
        let _lounges = segments.next();
        let (Some(country_slug), Some(airport_slug)) = (segments.next(), segments.next()) else {
            continue;
        };
        if country_slug.is_empty() || airport_slug.is_empty() {
            continue;
        }
        targets.insert(ListingTarget {
            url: format!("{base}{href}"),
            country_slug: country_slug.to_string(),
            airport_slug: airport_slug.to_string(),
        });
    }
    targets.into_iter().collect()
}

/// Parse one raw airport page into classified facility entries.
///
/// Pure function. Fails with `Parse` when the page carries neither an
/// airport heading nor any recognizable facility entry; the pipeline logs,
/// counts, and skips such pages.
pub fn extract_entries(listing: &RawListing) -> Result<Vec<ClassifiedEntry>> {
    let document = Html::parse_document(&listing.body);

    let heading = select_text(&document, "h1");
    let title = select_text(&document, "title");
    let title_code = title
        .as_deref()
        .and_then(|t| iata_from_title(t));

    let context = PageContext {
        heading: heading.as_deref(),
        title_code: title_code.as_deref(),
        listing,
    };

    let mut entries = extract_card_entries(&document, &context);
    entries.extend(extract_embedded_entries(&listing.body, &context));
    let entries = dedupe_entries(entries);

    if entries.is_empty() && heading.is_none() {
        return Err(LoungeMapError::parse(format!(
            "no recognizable listing content at {}",
            listing.source_url
        )));
    }
    Ok(entries)
}

/// Shared page-level fields every entry of one page inherits
struct PageContext<'a> {
    heading: Option<&'a str>,
    title_code: Option<&'a str>,
    listing: &'a RawListing,
}

impl PageContext<'_> {
    /// Assemble the free-text airport identifier for one entry.
    ///
    /// Priority: code recovered from the entry itself (detail slug or
    /// payload code field), then the page-title code, each prefixed to the
    /// airport display name so name matching remains available as a
    /// fallback; without any code, the display name or de-slugged airport
    /// path segment stands alone.
    fn identifier_text(&self, entry_code: Option<&str>) -> String {
        let code = entry_code.or(self.title_code);
        let name = self
            .heading
            .map(str::to_string)
            .unwrap_or_else(|| self.listing.airport_slug.replace('-', " "));

        match code {
            Some(code) if name.is_empty() => code.to_string(),
            Some(code) => format!("{code} {name}"),
            None => name,
        }
    }

    fn region_hint(&self) -> Option<String> {
        if self.listing.country_slug.is_empty() {
            None
        } else {
            Some(self.listing.country_slug.clone())
        }
    }
}

/// First text content for a CSS selector, whitespace-normalized
fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).expect("selector is valid");
    let element = document.select(&selector).next()?;
    let text = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
    if text.is_empty() { None } else { Some(text) }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "<CODE> Lounges" pattern in the page title
fn iata_from_title(title: &str) -> Option<String> {
    TITLE_CODE_RE
        .captures(&title.to_uppercase())
        .map(|c| c[1].to_string())
}

/// IATA/ICAO candidate from the leading letters of a detail slug
/// (e.g. `lhr15-club-aspire` yields `LHR`).
fn code_from_slug(slug: &str) -> Option<String> {
    let prefix = slug.split('-').next().unwrap_or("").to_uppercase();
    let letters: String = prefix.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    match letters.len() {
        3 | 4 => Some(letters),
        _ => None,
    }
}

/// Detail slug from a card href, query and fragment stripped
fn detail_slug_from_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let path = href.split(['?', '#']).next().unwrap_or("");
    let slug = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if slug.is_empty() || !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }
    Some(slug.to_lowercase())
}

/// Server-rendered anchor cards: link text "<CATEGORY> <facility name>"
fn extract_card_entries(document: &Html, context: &PageContext<'_>) -> Vec<ClassifiedEntry> {
    let anchor_selector = Selector::parse("a[href]").expect("anchor selector is valid");
    let mut entries = Vec::new();

    for anchor in document.select(&anchor_selector) {
        let href = anchor.value().attr("href").unwrap_or("");
        let text = normalize_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));
        if text.is_empty() {
            continue;
        }

        let mut parts = text.splitn(2, ' ');
        let head = parts.next().unwrap_or("");
        if !matches!(head.to_uppercase().as_str(), "LOUNGE" | "DINING" | "RELAX") {
            continue;
        }
        let facility_name = parts.next().unwrap_or(head).to_string();
        let Some(detail_slug) = detail_slug_from_href(href) else {
            continue;
        };

        let code = code_from_slug(&detail_slug);
        entries.push(ClassifiedEntry {
            airport_identifier_text: context.identifier_text(code.as_deref()),
            facility_name,
            category: classify_category(head),
            terminal: None,
            hours: None,
            detail_slug,
            region_hint: context.region_hint(),
        });
    }
    entries
}

/// Facility objects from the embedded page payload (all terminal tabs)
fn extract_embedded_entries(body: &str, context: &PageContext<'_>) -> Vec<ClassifiedEntry> {
    let normalized = body.replace("\\/", "/");
    let mut entries = Vec::new();

    for captures in EMBEDDED_PAYLOAD_RE.captures_iter(&normalized) {
        let facility_name = normalize_whitespace(&captures["name"]);
        let slug = captures["slug"].to_lowercase();
        if facility_name.is_empty() || slug.is_empty() {
            continue;
        }

        let code = captures
            .name("code")
            .and_then(|c| code_from_slug(&c.as_str().to_lowercase()))
            .or_else(|| code_from_slug(&slug));
        let terminal = captures
            .name("terminal")
            .map(|t| normalize_whitespace(t.as_str()))
            .filter(|t| !t.is_empty());
        let hours = captures
            .name("hours")
            .map(|h| normalize_whitespace(h.as_str()))
            .filter(|h| !h.is_empty());

        entries.push(ClassifiedEntry {
            airport_identifier_text: context.identifier_text(code.as_deref()),
            facility_name,
            category: classify_category(&captures["category"]),
            terminal,
            hours,
            detail_slug: slug,
            region_hint: context.region_hint(),
        });
    }
    entries
}

/// Drop duplicate records produced by the two extraction paths
fn dedupe_entries(entries: Vec<ClassifiedEntry>) -> Vec<ClassifiedEntry> {
    let mut seen: HashSet<(FacilityCategory, String)> = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert((entry.category, entry.detail_slug.clone())))
        .collect()
}
