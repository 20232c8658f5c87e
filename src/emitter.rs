//! Map emitter
//!
//! Consumes the final per-airport record set and renders the run artifacts:
//! a single self-contained Leaflet map page, a CSV export of the map rows,
//! the unresolved-record diagnostics file, and run metadata.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::Result;
use crate::error::LoungeMapError;
use crate::pipeline::PipelineOutcome;

/// Locations of the files written for one run
#[derive(Debug)]
pub struct EmittedArtifacts {
    pub map_html: PathBuf,
    pub airports_csv: PathBuf,
    pub unresolved_json: PathBuf,
    pub metadata_json: PathBuf,
}

/// One marker on the map, embedded into the HTML as JSON
#[derive(Debug, Serialize)]
struct MapPoint<'a> {
    lat: f64,
    lon: f64,
    code: &'a str,
    airport_name: &'a str,
    country: &'a str,
    lounge_count: usize,
    lounge_names: Vec<&'a str>,
}

/// Write all run artifacts under `output_dir` (`map/` and `data/` subdirs).
pub fn write_artifacts(
    output_dir: &Path,
    outcome: &PipelineOutcome,
    listing_source: &str,
    reference_source: &str,
) -> Result<EmittedArtifacts> {
    let map_dir = output_dir.join("map");
    let data_dir = output_dir.join("data");
    fs::create_dir_all(&map_dir)?;
    fs::create_dir_all(&data_dir)?;

    let artifacts = EmittedArtifacts {
        map_html: map_dir.join("lounge_map.html"),
        airports_csv: data_dir.join("lounge_airports.csv"),
        unresolved_json: data_dir.join("unresolved.json"),
        metadata_json: data_dir.join("metadata.json"),
    };

    write_map_html(&artifacts.map_html, outcome)?;
    write_airports_csv(&artifacts.airports_csv, outcome)?;
    write_unresolved(&artifacts.unresolved_json, outcome)?;
    write_metadata(
        &artifacts.metadata_json,
        outcome,
        listing_source,
        reference_source,
    )?;

    info!(
        "Wrote {} map markers to {}",
        outcome.airports.len(),
        artifacts.map_html.display()
    );
    Ok(artifacts)
}

fn map_points(outcome: &PipelineOutcome) -> Vec<MapPoint<'_>> {
    outcome
        .airports
        .values()
        .map(|entry| MapPoint {
            lat: entry.coordinates.latitude,
            lon: entry.coordinates.longitude,
            code: &entry.airport_code,
            airport_name: &entry.airport_name,
            country: &entry.country,
            lounge_count: entry.lounge_count(),
            lounge_names: entry.lounge_names.iter().map(String::as_str).collect(),
        })
        .collect()
}

fn write_map_html(path: &Path, outcome: &PipelineOutcome) -> Result<()> {
    let points = serde_json::to_string(&map_points(outcome))
        .map_err(|e| LoungeMapError::parse(format!("failed to encode map points: {e}")))?;
    let html = MAP_TEMPLATE
        .replace("__LOUNGEMAP_POINTS__", &points)
        .replace("__LOUNGEMAP_GENERATED__", &Utc::now().format("%Y-%m-%d").to_string());
    fs::write(path, html)?;
    Ok(())
}

fn write_airports_csv(path: &Path, outcome: &PipelineOutcome) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| LoungeMapError::parse(format!("failed to open CSV export: {e}")))?;
    writer
        .write_record([
            "airport_code",
            "airport_name",
            "country",
            "latitude",
            "longitude",
            "lounge_count",
            "lounge_names",
        ])
        .map_err(|e| LoungeMapError::parse(e.to_string()))?;

    for entry in outcome.airports.values() {
        let names: Vec<&str> = entry.lounge_names.iter().map(String::as_str).collect();
        writer
            .write_record([
                entry.airport_code.as_str(),
                entry.airport_name.as_str(),
                entry.country.as_str(),
                &entry.coordinates.latitude.to_string(),
                &entry.coordinates.longitude.to_string(),
                &entry.lounge_count().to_string(),
                &names.join(" | "),
            ])
            .map_err(|e| LoungeMapError::parse(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| LoungeMapError::parse(e.to_string()))?;
    Ok(())
}

fn write_unresolved(path: &Path, outcome: &PipelineOutcome) -> Result<()> {
    let body = serde_json::to_string_pretty(&outcome.unresolved)
        .map_err(|e| LoungeMapError::parse(format!("failed to encode unresolved log: {e}")))?;
    fs::write(path, body)?;
    Ok(())
}

fn write_metadata(
    path: &Path,
    outcome: &PipelineOutcome,
    listing_source: &str,
    reference_source: &str,
) -> Result<()> {
    let metadata = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "listing_source": listing_source,
        "reference_source": reference_source,
        "map_airport_count": outcome.airports.len(),
        "unresolved_count": outcome.unresolved.len(),
        "stats": &outcome.stats,
        "notes": "Dining and relaxation experiences are excluded; only lounges are retained.",
    });
    let body = serde_json::to_string_pretty(&metadata)
        .map_err(|e| LoungeMapError::parse(format!("failed to encode metadata: {e}")))?;
    fs::write(path, body)?;
    Ok(())
}

/// Self-contained Leaflet page. Marker data replaces the placeholder token.
const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Priority Pass Lounges Map</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css" />
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css" />
  <style>
    html, body { width: 100%; height: 100%; margin: 0; padding: 0; overflow: hidden; }
    #map { position: fixed; inset: 0; width: 100vw; height: 100vh; }
    .search-panel {
      position: fixed; top: 14px; left: 100px; z-index: 1200;
      display: flex; align-items: center; gap: 6px;
      background: rgba(255, 255, 255, 0.95); border: 1px solid #d8dde6;
      border-radius: 8px; padding: 8px;
      box-shadow: 0 3px 10px rgba(0, 0, 0, 0.12);
    }
    .search-panel input {
      width: 280px; max-width: 56vw; border: 1px solid #d8dde6;
      border-radius: 6px; padding: 8px 10px; font-size: 14px; outline: none;
    }
    .search-panel button {
      border: 1px solid #2c7be5; background: #2c7be5; color: #fff;
      border-radius: 6px; width: 34px; height: 34px; cursor: pointer;
      font-size: 16px; line-height: 1;
    }
    .search-panel button:hover { background: #1f6fd6; }
    .search-hint {
      position: fixed; top: 66px; left: 100px; z-index: 1200;
      background: rgba(255, 255, 255, 0.95); border: 1px solid #d8dde6;
      border-radius: 6px; padding: 6px 8px; font-size: 12px; color: #5f6b7a;
      display: none;
    }
    .pp-popup { width: 290px; max-height: 370px; overflow-y: auto; padding-right: 4px; }
    .pp-popup .item { margin: 6px 0; }
    .map-footer {
      position: fixed; left: 12px; bottom: 10px; z-index: 1200;
      background: rgba(255, 255, 255, 0.92); border: 1px solid #d8dde6;
      border-radius: 6px; padding: 6px 8px; font-size: 11px; color: #445066;
      max-width: min(760px, 78vw);
    }
  </style>
</head>
<body>
  <div class="search-panel">
    <input id="airportSearchInput" type="text" placeholder="Enter airport code or name" />
    <button id="airportSearchBtn" aria-label="Search airport">&#10148;</button>
  </div>
  <div id="searchHint" class="search-hint"></div>
  <div class="map-footer">
    Generated __LOUNGEMAP_GENERATED__. Not affiliated with Priority Pass. Data may be incomplete or outdated.
  </div>
  <div id="map"></div>
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>
  <script>
    const points = __LOUNGEMAP_POINTS__;
    const worldBounds = L.latLngBounds([[-85, -180], [85, 180]]);
    const map = L.map('map', {
      minZoom: 2,
      maxBounds: worldBounds,
      maxBoundsViscosity: 1.0,
      worldCopyJump: false
    }).setView([20, 0], 2);
    L.tileLayer('https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png', {
      attribution: '&copy; OpenStreetMap contributors &copy; CARTO',
      noWrap: true,
      bounds: worldBounds
    }).addTo(map);

    const clusters = L.markerClusterGroup();
    const markersByCode = new Map();
    const searchRows = [];

    function escapeHtml(input) {
      return String(input || '')
        .replaceAll('&', '&amp;')
        .replaceAll('<', '&lt;')
        .replaceAll('>', '&gt;')
        .replaceAll('"', '&quot;')
        .replaceAll("'", '&#39;');
    }

    function norm(input) {
      return String(input || '').toLowerCase().replaceAll(/\s+/g, ' ').trim();
    }

    function showHint(text) {
      const hint = document.getElementById('searchHint');
      if (!text) {
        hint.style.display = 'none';
        hint.textContent = '';
        return;
      }
      hint.textContent = text;
      hint.style.display = 'block';
      window.clearTimeout(window.__hintTimer);
      window.__hintTimer = window.setTimeout(() => { hint.style.display = 'none'; }, 2200);
    }

    function zoomToMarker(marker) {
      clusters.zoomToShowLayer(marker, () => {
        const targetZoom = Math.max(map.getZoom(), 5);
        map.flyTo(marker.getLatLng(), targetZoom, { duration: 0.8 });
        marker.openPopup();
      });
    }

    points.forEach((p) => {
      const tooltip = `<b>${escapeHtml(p.airport_name)}</b><br>Code: ${escapeHtml(p.code)}<br>Country: ${escapeHtml(p.country)}<br>Lounges: ${p.lounge_count}`;

      let popup = `<div class="pp-popup"><h4 style="margin:0 0 8px 0;">${escapeHtml(p.airport_name)} (${escapeHtml(p.code)})</h4><div>Country: ${escapeHtml(p.country)}</div><div>Lounge count: ${p.lounge_count}</div><hr style="margin:8px 0;" />`;
      for (const name of p.lounge_names) {
        popup += `<div class="item">${escapeHtml(name)}</div>`;
      }
      popup += '</div>';

      const marker = L.circleMarker([p.lat, p.lon], {
        radius: 5,
        color: '#2c7be5',
        weight: 1,
        fillColor: '#2c7be5',
        fillOpacity: 0.85
      });
      marker.bindTooltip(tooltip, { sticky: true });
      marker.bindPopup(popup, { maxWidth: 320 });
      clusters.addLayer(marker);

      const codeKey = norm(p.code);
      if (codeKey && !markersByCode.has(codeKey)) {
        markersByCode.set(codeKey, marker);
      }
      searchRows.push({
        marker: marker,
        code: codeKey,
        airportName: norm(p.airport_name),
        country: norm(p.country),
        combined: norm(`${p.code} ${p.airport_name} ${p.country}`),
      });
    });

    map.addLayer(clusters);

    function searchAirport() {
      const inputEl = document.getElementById('airportSearchInput');
      const query = norm(inputEl.value);
      if (!query) {
        showHint('Enter an airport code or name');
        return;
      }

      if (markersByCode.has(query)) {
        zoomToMarker(markersByCode.get(query));
        showHint('');
        return;
      }

      let hit = searchRows.find((r) => r.airportName === query || r.combined === query);
      if (!hit) {
        hit = searchRows.find((r) => r.airportName.includes(query) || r.combined.includes(query) || r.country.includes(query));
      }

      if (!hit) {
        showHint('No matching airport; try its IATA code');
        return;
      }
      zoomToMarker(hit.marker);
      showHint('');
    }

    document.getElementById('airportSearchBtn').addEventListener('click', searchAirport);
    document.getElementById('airportSearchInput').addEventListener('keydown', (evt) => {
      if (evt.key === 'Enter') {
        evt.preventDefault();
        searchAirport();
      }
    });

    window.addEventListener('resize', () => { map.invalidateSize(true); });
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::LoungeAggregator;
    use crate::models::{
        AirportRef, ClassifiedEntry, FacilityCategory, MatchConfidence, ResolvedLoungeRecord,
    };
    use crate::pipeline::RunStats;
    use tempfile::TempDir;

    fn sample_outcome() -> PipelineOutcome {
        let airport = AirportRef::new("LHR", "London Heathrow Airport", "GB", 51.47, -0.45);
        let entry = ClassifiedEntry {
            airport_identifier_text: "LHR".to_string(),
            facility_name: "No1 Lounge".to_string(),
            category: FacilityCategory::Lounge,
            terminal: Some("Terminal 3".to_string()),
            hours: None,
            detail_slug: "lhr15-no1-lounge".to_string(),
            region_hint: None,
        };
        let mystery = ClassifiedEntry {
            airport_identifier_text: "nowhere special".to_string(),
            facility_name: "Mystery Lounge".to_string(),
            category: FacilityCategory::Lounge,
            terminal: None,
            hours: None,
            detail_slug: "mystery".to_string(),
            region_hint: None,
        };

        let aggregated = LoungeAggregator::merge(vec![
            ResolvedLoungeRecord::resolved(&airport, &entry, MatchConfidence::ExactCode),
            ResolvedLoungeRecord::unresolved(&mystery),
        ]);
        PipelineOutcome {
            airports: aggregated.airports,
            unresolved: aggregated.unresolved,
            stats: RunStats::default(),
        }
    }

    #[test]
    fn test_write_artifacts() {
        let dir = TempDir::new().unwrap();
        let outcome = sample_outcome();

        let artifacts = write_artifacts(
            dir.path(),
            &outcome,
            "https://www.prioritypass.com/airport-lounges",
            "https://ourairports.com/data/airports.csv",
        )
        .unwrap();

        let html = fs::read_to_string(&artifacts.map_html).unwrap();
        assert!(html.contains("\"code\":\"LHR\""));
        assert!(html.contains("No1 Lounge"));
        assert!(!html.contains("__LOUNGEMAP_POINTS__"));

        let csv_body = fs::read_to_string(&artifacts.airports_csv).unwrap();
        assert!(csv_body.starts_with("airport_code,"));
        assert!(csv_body.contains("LHR,London Heathrow Airport,GB"));

        let unresolved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&artifacts.unresolved_json).unwrap()).unwrap();
        assert_eq!(unresolved.as_array().unwrap().len(), 1);

        let metadata: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&artifacts.metadata_json).unwrap()).unwrap();
        assert_eq!(metadata["map_airport_count"], 1);
        assert_eq!(metadata["unresolved_count"], 1);
    }
}
