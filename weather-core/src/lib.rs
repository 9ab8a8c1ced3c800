//! Core library for the weather widget.
//!
//! This crate defines:
//! - Location resolution (device position or city name)
//! - OpenWeather clients for current conditions, air quality and geocoding
//! - Unit conversion and the display view-model
//! - `WeatherSession`, which owns the last snapshot and the display unit
//!
//! It is used by the `weather-widget` binary, but any host that can supply a
//! [`RenderSink`] and optionally a [`GeolocationSource`] can drive it.

pub mod air_quality;
pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod session;
pub mod units;
pub mod view;

pub use air_quality::{AirQualityCategory, classify};
pub use config::Config;
pub use error::WidgetError;
pub use location::{FixedPosition, GeolocationSource, LocationResolver};
pub use model::{
    AirQualitySnapshot, AirQualityStatus, Conditions, Coordinates, GeocodedPlace,
    WeatherSnapshot,
};
pub use provider::{
    AirQualityClient, Geocoder, Providers, WeatherClient, openweather::OpenWeatherClient,
};
pub use session::{LookupOutcome, LookupTarget, SessionPhase, WeatherSession};
pub use units::DisplayUnit;
pub use view::{AirQualityView, RenderSink, ViewModel};
