use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    Config,
    error::WidgetError,
    model::{AirQualitySnapshot, Coordinates, GeocodedPlace, WeatherSnapshot},
    provider::openweather::OpenWeatherClient,
};

pub mod openweather;

/// Current-conditions endpoint.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_weather(&self, coords: Coordinates) -> Result<WeatherSnapshot, WidgetError>;
}

/// Air-pollution endpoint.
#[async_trait]
pub trait AirQualityClient: Send + Sync + Debug {
    /// Fails with `EmptyAirQualityData` when the provider has no entries for the spot.
    async fn fetch_air_quality(
        &self,
        coords: Coordinates,
    ) -> Result<AirQualitySnapshot, WidgetError>;
}

/// Direct (name to coordinates) geocoding endpoint.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn geocode(&self, city_name: &str) -> Result<Vec<GeocodedPlace>, WidgetError>;
}

/// The three collaborators a session needs, usually backed by one client.
#[derive(Debug, Clone)]
pub struct Providers {
    pub weather: Arc<dyn WeatherClient>,
    pub air_quality: Arc<dyn AirQualityClient>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl Providers {
    /// Uses one client for all three endpoints.
    pub fn from_client<C>(client: C) -> Self
    where
        C: WeatherClient + AirQualityClient + Geocoder + 'static,
    {
        let client = Arc::new(client);
        Self {
            weather: client.clone(),
            air_quality: client.clone(),
            geocoder: client,
        }
    }
}

/// Construct the OpenWeather-backed providers from config.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Providers> {
    let client = OpenWeatherClient::from_config(config)?;
    Ok(Providers::from_client(client))
}
