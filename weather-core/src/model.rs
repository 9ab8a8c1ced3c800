use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{air_quality::AirQualityCategory, error::WidgetError};

/// A longitude/latitude pair, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    lon: f64,
    lat: f64,
}

impl Coordinates {
    pub fn new(lon: f64, lat: f64) -> Result<Self, WidgetError> {
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(WidgetError::InvalidCoordinates);
        }
        Ok(Self { lon, lat })
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lat {:.4}, lon {:.4}", self.lat, self.lon)
    }
}

/// Current conditions exactly as the provider reported them (Kelvin, m/s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_k: f64,
    pub temp_max_k: f64,
    pub temp_min_k: f64,
    pub feels_like_k: f64,
    pub wind_speed_mps: f64,
    pub humidity_pct: u8,
    pub icon_code: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySnapshot {
    pub category: AirQualityCategory,
    pub fetched_at: DateTime<Utc>,
}

impl AirQualitySnapshot {
    pub fn index(&self) -> u8 {
        self.category.index()
    }
}

/// Air quality as far as the last lookup got.
#[derive(Debug, Clone, PartialEq)]
pub enum AirQualityStatus {
    Available(AirQualitySnapshot),
    Unavailable(WidgetError),
}

impl From<Result<AirQualitySnapshot, WidgetError>> for AirQualityStatus {
    fn from(result: Result<AirQualitySnapshot, WidgetError>) -> Self {
        match result {
            Ok(snapshot) => AirQualityStatus::Available(snapshot),
            Err(err) => AirQualityStatus::Unavailable(err),
        }
    }
}

/// The snapshot pair produced by one successful lookup. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditions {
    pub weather: WeatherSnapshot,
    pub air_quality: AirQualityStatus,
}

/// A place returned by the geocoding service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodedPlace {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_accept_the_full_valid_range() {
        assert!(Coordinates::new(0.0, 0.0).is_ok());
        assert!(Coordinates::new(180.0, 90.0).is_ok());
        assert!(Coordinates::new(-180.0, -90.0).is_ok());
        assert!(Coordinates::new(2.35, 48.85).is_ok());
    }

    #[test]
    fn coordinates_reject_out_of_range() {
        assert_eq!(
            Coordinates::new(181.0, 0.0),
            Err(WidgetError::InvalidCoordinates)
        );
        assert_eq!(
            Coordinates::new(0.0, -91.0),
            Err(WidgetError::InvalidCoordinates)
        );
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn air_quality_status_from_result() {
        let status: AirQualityStatus = Err(WidgetError::EmptyAirQualityData).into();
        assert_eq!(
            status,
            AirQualityStatus::Unavailable(WidgetError::EmptyAirQualityData)
        );
    }
}
