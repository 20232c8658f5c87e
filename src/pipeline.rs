//! Pipeline orchestration
//!
//! Runs fetch, classify and resolve for every work-list item under a
//! fixed-size worker pool, then folds the results into the aggregator.
//! Failures are isolated per item: one exhausted fetch or unparseable page
//! is counted and skipped, never aborting the run. A cancellation token
//! halts dispatch of new items while in-flight fetches finish naturally,
//! so partial results still reach the emitter.

use std::collections::BTreeMap;

use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Result;
use crate::aggregate::LoungeAggregator;
use crate::airports::AirportIndex;
use crate::error::LoungeMapError;
use crate::listings::{ListingSource, parser};
use crate::models::{
    AirportMapEntry, FacilityCategory, ListingTarget, MatchConfidence, ResolvedLoungeRecord,
};
use crate::reconcile;

/// Tunables for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Fixed worker-pool size
    pub workers: usize,
    /// Optional cap on airport pages processed
    pub max_airports: Option<usize>,
    /// Restrict the work list to these country slugs; empty means worldwide
    pub regions: Vec<String>,
    /// Acceptance threshold for name-based resolution
    pub name_match_threshold: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: 10,
            max_airports: None,
            regions: Vec::new(),
            name_match_threshold: reconcile::DEFAULT_NAME_MATCH_THRESHOLD,
        }
    }
}

/// Aggregate counters reported at end of run so operators can judge
/// data-quality drift in the external source over time.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub pages_fetched: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    pub classified_lounge: u64,
    pub classified_dining: u64,
    pub classified_relaxation: u64,
    pub classified_other: u64,
    pub resolved_exact: u64,
    pub resolved_by_name: u64,
    pub unresolved: u64,
}

impl RunStats {
    fn record_category(&mut self, category: FacilityCategory) {
        match category {
            FacilityCategory::Lounge => self.classified_lounge += 1,
            FacilityCategory::Dining => self.classified_dining += 1,
            FacilityCategory::Relaxation => self.classified_relaxation += 1,
            FacilityCategory::Other => self.classified_other += 1,
        }
    }

    fn record_confidence(&mut self, confidence: MatchConfidence) {
        match confidence {
            MatchConfidence::ExactCode => self.resolved_exact += 1,
            MatchConfidence::NameMatch => self.resolved_by_name += 1,
            MatchConfidence::Unresolved => self.unresolved += 1,
        }
    }

    /// Log the end-of-run report
    pub fn log_summary(&self) {
        info!(
            "Pages: {} fetched, {} fetch failures, {} parse failures",
            self.pages_fetched, self.fetch_failures, self.parse_failures
        );
        info!(
            "Classified: {} lounge, {} dining, {} relaxation, {} other (dropped)",
            self.classified_lounge,
            self.classified_dining,
            self.classified_relaxation,
            self.classified_other
        );
        info!(
            "Resolved: {} by exact code, {} by name, {} unresolved",
            self.resolved_exact, self.resolved_by_name, self.unresolved
        );
    }
}

/// Everything a finished run hands to the map emitter
#[derive(Debug)]
pub struct PipelineOutcome {
    /// One entry per lounge-enabled airport, keyed by code
    pub airports: BTreeMap<String, AirportMapEntry>,
    /// Diagnostics list of records excluded from the map
    pub unresolved: Vec<ResolvedLoungeRecord>,
    pub stats: RunStats,
}

/// Per-item result carried back to the aggregation sink
#[derive(Debug, Default)]
struct TargetReport {
    records: Vec<ResolvedLoungeRecord>,
    categories: Vec<FacilityCategory>,
}

/// Fetch, classify and resolve one airport page. Pure apart from the fetch.
async fn process_target(
    source: &dyn ListingSource,
    index: &AirportIndex,
    name_match_threshold: f64,
    target: &ListingTarget,
) -> Result<TargetReport> {
    let raw = source.airport_page(target).await?;
    let entries = parser::extract_entries(&raw)?;

    let mut report = TargetReport::default();
    for entry in entries {
        report.categories.push(entry.category);
        if entry.category == FacilityCategory::Lounge {
            report
                .records
                .push(reconcile::resolve(&entry, index, name_match_threshold));
        }
    }
    Ok(report)
}

/// Apply region restriction and the optional airport cap to the work list
fn apply_work_list_limits(
    targets: Vec<ListingTarget>,
    options: &PipelineOptions,
) -> Vec<ListingTarget> {
    let mut targets = targets;
    if !options.regions.is_empty() {
        let before = targets.len();
        targets.retain(|t| {
            options
                .regions
                .iter()
                .any(|region| region.eq_ignore_ascii_case(&t.country_slug))
        });
        info!(
            "Region filter kept {} of {} airport pages",
            targets.len(),
            before
        );
    }
    if let Some(cap) = options.max_airports {
        if targets.len() > cap {
            info!("Capping work list at {cap} of {} airport pages", targets.len());
            targets.truncate(cap);
        }
    }
    targets
}

/// Run the full acquisition-and-reconciliation pipeline.
///
/// Only a failure to obtain the work list itself is fatal here; every
/// per-item failure is isolated. The reference index must already be
/// loaded; its absence is the one condition that aborts before any
/// fetching starts.
pub async fn run(
    source: &dyn ListingSource,
    index: &AirportIndex,
    options: &PipelineOptions,
    cancel: CancellationToken,
) -> Result<PipelineOutcome> {
    let targets = source.airport_index().await?;
    let targets = apply_work_list_limits(targets, options);
    info!(
        "Processing {} airport pages with {} workers",
        targets.len(),
        options.workers
    );

    let mut stats = RunStats::default();
    let mut aggregator = LoungeAggregator::new();
    let threshold = options.name_match_threshold;

    let mut results = Box::pin(
        stream::iter(targets)
            .take_while(|_| {
                let dispatch = !cancel.is_cancelled();
                async move { dispatch }
            })
            .map(|target| async move {
                let outcome = process_target(source, index, threshold, &target).await;
                (target, outcome)
            })
            .buffer_unordered(options.workers.max(1)),
    );

    // Single consumer: all aggregation happens on this side of the stream,
    // so workers never touch shared mutable state.
    while let Some((target, outcome)) = results.next().await {
        match outcome {
            Ok(report) => {
                stats.pages_fetched += 1;
                for category in report.categories {
                    stats.record_category(category);
                }
                for record in report.records {
                    stats.record_confidence(record.confidence);
                    aggregator.insert(record);
                }
            }
            Err(e) => {
                if matches!(e, LoungeMapError::Parse { .. }) {
                    stats.parse_failures += 1;
                } else {
                    stats.fetch_failures += 1;
                }
                warn!("Skipping {}: {}", target.url, e);
            }
        }
    }

    if cancel.is_cancelled() {
        warn!("Stop signal received; aggregating partial results");
    }

    stats.log_summary();
    let aggregated = aggregator.finish();
    info!(
        "Aggregated {} lounge-enabled airports ({} unresolved records)",
        aggregated.airports.len(),
        aggregated.unresolved.len()
    );

    Ok(PipelineOutcome {
        airports: aggregated.airports,
        unresolved: aggregated.unresolved,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(country: &str, airport: &str) -> ListingTarget {
        ListingTarget {
            url: format!("https://example.com/lounges/{country}/{airport}"),
            country_slug: country.to_string(),
            airport_slug: airport.to_string(),
        }
    }

    #[test]
    fn test_region_filter() {
        let targets = vec![
            target("france", "charles-de-gaulle"),
            target("united-kingdom", "heathrow"),
            target("france", "orly"),
        ];
        let options = PipelineOptions {
            regions: vec!["France".to_string()],
            ..PipelineOptions::default()
        };
        let kept = apply_work_list_limits(targets, &options);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|t| t.country_slug == "france"));
    }

    #[test]
    fn test_max_airports_cap() {
        let targets = vec![
            target("a", "one"),
            target("b", "two"),
            target("c", "three"),
        ];
        let options = PipelineOptions {
            max_airports: Some(2),
            ..PipelineOptions::default()
        };
        assert_eq!(apply_work_list_limits(targets, &options).len(), 2);
    }

    #[test]
    fn test_stats_counters() {
        let mut stats = RunStats::default();
        stats.record_category(FacilityCategory::Lounge);
        stats.record_category(FacilityCategory::Dining);
        stats.record_category(FacilityCategory::Other);
        stats.record_confidence(MatchConfidence::ExactCode);
        stats.record_confidence(MatchConfidence::Unresolved);

        assert_eq!(stats.classified_lounge, 1);
        assert_eq!(stats.classified_dining, 1);
        assert_eq!(stats.classified_other, 1);
        assert_eq!(stats.resolved_exact, 1);
        assert_eq!(stats.unresolved, 1);
    }
}
