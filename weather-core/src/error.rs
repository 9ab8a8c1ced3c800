use thiserror::Error;

/// Every way a lookup, a fetch or a classification can fail.
///
/// Cloneable so the session can keep the last failure next to its `Failed` phase
/// and hand it to the render sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error("Geolocation is not available on this device")]
    GeolocationUnavailable,

    #[error("Permission to read the device location was denied")]
    GeolocationDenied,

    #[error("Timed out waiting for the device location")]
    GeolocationTimeout,

    #[error("City '{0}' was not found")]
    CityNotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Air quality data not available")]
    EmptyAirQualityData,

    #[error("Air quality index {0} is outside the known range 1-6")]
    InvalidAirQualityIndex(i64),

    #[error("Invalid coordinates: latitude must be -90 to 90, longitude must be -180 to 180")]
    InvalidCoordinates,
}

impl WidgetError {
    /// Only missing air-quality entries leave the rest of a lookup usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WidgetError::EmptyAirQualityData)
    }
}

impl From<reqwest::Error> for WidgetError {
    fn from(err: reqwest::Error) -> Self {
        WidgetError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for WidgetError {
    fn from(err: serde_json::Error) -> Self {
        WidgetError::MalformedResponse(err.to_string())
    }
}
