use serde::{Deserialize, Serialize};

use crate::error::WidgetError;

/// Air-quality category for the provider's 1-6 index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AirQualityCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AirQualityCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AirQualityCategory::Good => "GOOD",
            AirQualityCategory::Moderate => "Moderate",
            AirQualityCategory::UnhealthyForSensitiveGroups => "Unhealthy for sensitive groups",
            AirQualityCategory::Unhealthy => "Unhealthy",
            AirQualityCategory::VeryUnhealthy => "Very Unhealthy",
            AirQualityCategory::Hazardous => "Hazardous",
        }
    }

    /// Whether the UI should give this category visual prominence.
    pub fn emphasize(&self) -> bool {
        matches!(self, AirQualityCategory::UnhealthyForSensitiveGroups)
    }

    pub fn index(&self) -> u8 {
        match self {
            AirQualityCategory::Good => 1,
            AirQualityCategory::Moderate => 2,
            AirQualityCategory::UnhealthyForSensitiveGroups => 3,
            AirQualityCategory::Unhealthy => 4,
            AirQualityCategory::VeryUnhealthy => 5,
            AirQualityCategory::Hazardous => 6,
        }
    }
}

impl std::fmt::Display for AirQualityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<i64> for AirQualityCategory {
    type Error = WidgetError;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        classify(index)
    }
}

/// Maps an index to its category. Anything outside 1-6 is an error, never a default.
pub fn classify(index: i64) -> Result<AirQualityCategory, WidgetError> {
    match index {
        1 => Ok(AirQualityCategory::Good),
        2 => Ok(AirQualityCategory::Moderate),
        3 => Ok(AirQualityCategory::UnhealthyForSensitiveGroups),
        4 => Ok(AirQualityCategory::Unhealthy),
        5 => Ok(AirQualityCategory::VeryUnhealthy),
        6 => Ok(AirQualityCategory::Hazardous),
        other => Err(WidgetError::InvalidAirQualityIndex(other)),
    }
}
