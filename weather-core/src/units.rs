//! Temperature and wind-speed conversions.
//!
//! Canonical readings stay in Kelvin and metres per second. Truncation toward zero
//! happens only here, at the display boundary, so converting the same stored value
//! twice always yields the same figure.

use serde::{Deserialize, Serialize};

const KELVIN_OFFSET: f64 = 273.15;
const MPH_PER_MPS: f64 = 2.237;

/// `trunc(k - 273.15)`. Drops the fractional degree on purpose.
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    (kelvin - KELVIN_OFFSET).trunc()
}

/// `c * 9 / 5 + 32`, untruncated.
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// `(f - 32) * 5 / 9`, untruncated.
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Fahrenheit straight from Kelvin, truncated once at the end.
pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    celsius_to_fahrenheit(kelvin - KELVIN_OFFSET).trunc()
}

/// `trunc(mps * 2.237)`.
pub fn mps_to_mph(mps: f64) -> f64 {
    (mps * MPH_PER_MPS).trunc()
}

/// Unit the temperatures are shown in. Wind is always shown in mph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl DisplayUnit {
    pub fn toggled(self) -> Self {
        match self {
            DisplayUnit::Celsius => DisplayUnit::Fahrenheit,
            DisplayUnit::Fahrenheit => DisplayUnit::Celsius,
        }
    }

    /// Converts a canonical Kelvin reading into this unit, truncated for display.
    pub fn from_kelvin(self, kelvin: f64) -> f64 {
        match self {
            DisplayUnit::Celsius => kelvin_to_celsius(kelvin),
            DisplayUnit::Fahrenheit => kelvin_to_fahrenheit(kelvin),
        }
    }

    /// Suffix appended after the number. Celsius keeps the bare degree sign.
    pub fn suffix(self) -> &'static str {
        match self {
            DisplayUnit::Celsius => "°",
            DisplayUnit::Fahrenheit => "°F",
        }
    }

    /// Formats a canonical Kelvin reading, e.g. `27°` or `80°F`.
    pub fn format_kelvin(self, kelvin: f64) -> String {
        format!("{}{}", whole(self.from_kelvin(kelvin)), self.suffix())
    }
}

impl std::fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayUnit::Celsius => f.write_str("Celsius"),
            DisplayUnit::Fahrenheit => f.write_str("Fahrenheit"),
        }
    }
}

/// Formats wind speed in mph, e.g. `11mph`.
pub fn format_wind(mps: f64) -> String {
    format!("{}mph", whole(mps_to_mph(mps)))
}

// Truncated values are whole numbers already; the cast also folds -0 into 0.
fn whole(value: f64) -> i64 {
    value as i64
}
