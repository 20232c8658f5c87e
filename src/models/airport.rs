//! Airport reference model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Format coordinates as a display string
    #[must_use]
    pub fn format(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// One row of the canonical airport reference table.
///
/// Immutable once loaded; owned by the [`crate::airports::AirportIndex`]
/// for the lifetime of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRef {
    /// Primary key: IATA code when the airport has one, otherwise its ident
    pub code: String,
    /// ICAO-style ident, when distinct from `code`
    pub icao: Option<String>,
    /// Official airport name
    pub name: String,
    /// Municipality served by the airport
    pub city: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    pub country: String,
    pub coordinates: Coordinates,
}

impl AirportRef {
    /// Create a reference row keyed by IATA code
    #[must_use]
    pub fn new(code: &str, name: &str, country: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            code: code.to_uppercase(),
            icao: None,
            name: name.to_string(),
            city: None,
            country: country.to_uppercase(),
            coordinates: Coordinates::new(latitude, longitude),
        }
    }

    /// Attach the municipality
    #[must_use]
    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }

    /// Attach the ICAO ident
    #[must_use]
    pub fn with_icao(mut self, icao: &str) -> Self {
        self.icao = Some(icao.to_uppercase());
        self
    }
}
