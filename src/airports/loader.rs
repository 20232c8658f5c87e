//! Airport reference table loader
//!
//! Parses the OurAirports-style CSV (local file or downloaded body) into
//! [`AirportRef`] rows. Individual unusable rows are skipped; a missing
//! file, missing required columns, or an empty result is fatal.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::LoungeMapError;
use crate::models::AirportRef;
use crate::Result;

/// Canonical source of the worldwide airport dataset
pub const OURAIRPORTS_CSV_URL: &str = "https://ourairports.com/data/airports.csv";

/// Header columns the reference table must provide
const REQUIRED_COLUMNS: [&str; 4] = ["ident", "name", "latitude_deg", "longitude_deg"];

/// One CSV row in the OurAirports column layout. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct ReferenceRow {
    #[serde(default)]
    ident: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    latitude_deg: Option<f64>,
    #[serde(default)]
    longitude_deg: Option<f64>,
    #[serde(default)]
    iso_country: String,
    #[serde(default)]
    municipality: String,
    #[serde(default)]
    iata_code: String,
}

impl ReferenceRow {
    /// Convert to an [`AirportRef`], or `None` when the row has no code or
    /// no coordinates.
    fn into_airport(self) -> Option<AirportRef> {
        let (latitude, longitude) = (self.latitude_deg?, self.longitude_deg?);

        let iata = self.iata_code.trim().to_uppercase();
        let ident = self.ident.trim().to_uppercase();
        let code = if iata.is_empty() { ident.clone() } else { iata };
        if code.is_empty() {
            return None;
        }

        let mut airport = AirportRef::new(&code, self.name.trim(), self.iso_country.trim(), latitude, longitude);
        if !ident.is_empty() && ident != airport.code {
            airport = airport.with_icao(&ident);
        }
        let city = self.municipality.trim();
        if !city.is_empty() {
            airport = airport.with_city(city);
        }
        Some(airport)
    }
}

/// Load and parse the reference table from a local CSV file
pub fn load_reference_file<P: AsRef<Path>>(path: P) -> Result<Vec<AirportRef>> {
    let path = path.as_ref();
    info!("Loading airport reference table from: {:?}", path);

    let file = File::open(path).map_err(|e| {
        LoungeMapError::data_load(format!("cannot open {}: {e}", path.display()))
    })?;
    parse_reference(BufReader::new(file))
}

/// Parse reference CSV content into airport rows.
///
/// Fails with a `DataLoad` error when required columns are missing or no
/// usable row survives; individual bad rows are skipped with a debug count.
pub fn parse_reference<R: Read>(reader: R) -> Result<Vec<AirportRef>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| LoungeMapError::data_load(format!("unreadable CSV header: {e}")))?
        .clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(LoungeMapError::data_load(format!(
            "reference table is missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut airports = Vec::new();
    let mut skipped = 0usize;

    for row in csv_reader.deserialize::<ReferenceRow>() {
        match row {
            Ok(row) => match row.into_airport() {
                Some(airport) => airports.push(airport),
                None => skipped += 1,
            },
            Err(e) => {
                debug!("Skipping malformed reference row: {e}");
                skipped += 1;
            }
        }
    }

    if airports.is_empty() {
        return Err(LoungeMapError::data_load(
            "reference table contains no usable airport rows",
        ));
    }

    info!(
        "Loaded {} airports from reference table ({} rows skipped)",
        airports.len(),
        skipped
    );
    Ok(airports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_CSV: &str = "\
id,ident,type,name,latitude_deg,longitude_deg,iso_country,municipality,iata_code
1,EGLL,large_airport,London Heathrow Airport,51.4706,-0.461941,GB,London,LHR
2,LFPG,large_airport,Charles de Gaulle International Airport,49.012798,2.55,FR,Paris,CDG
3,XX-0001,small_airport,Nameless Strip,10.0,20.0,XX,,
4,ZZZZ,heliport,Broken Row,,,ZZ,Nowhere,
";

    #[test]
    fn test_parse_reference_skips_unusable_rows() {
        let airports = parse_reference(SAMPLE_CSV.as_bytes()).unwrap();
        // The coordinate-less row is dropped; the code-only strip survives.
        assert_eq!(airports.len(), 3);

        let lhr = airports.iter().find(|a| a.code == "LHR").unwrap();
        assert_eq!(lhr.icao.as_deref(), Some("EGLL"));
        assert_eq!(lhr.city.as_deref(), Some("London"));
        assert_eq!(lhr.country, "GB");

        let strip = airports.iter().find(|a| a.code == "XX-0001").unwrap();
        assert!(strip.city.is_none());
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let csv = "ident,name,latitude_deg\nLHR,Heathrow,51.47\n";
        let err = parse_reference(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoungeMapError::DataLoad { .. }));
        assert!(err.to_string().contains("longitude_deg"));
    }

    #[test]
    fn test_empty_table_is_fatal() {
        let csv = "id,ident,type,name,latitude_deg,longitude_deg,iso_country,municipality,iata_code\n";
        let err = parse_reference(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoungeMapError::DataLoad { .. }));
    }

    #[test]
    fn test_load_reference_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(SAMPLE_CSV.as_bytes()).unwrap();

        let airports = load_reference_file(temp_file.path()).unwrap();
        assert_eq!(airports.len(), 3);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = load_reference_file("nonexistent_airports.csv");
        assert!(matches!(result, Err(LoungeMapError::DataLoad { .. })));
    }
}
