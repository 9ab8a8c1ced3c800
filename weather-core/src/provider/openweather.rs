use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::{
    Config,
    air_quality::classify,
    error::WidgetError,
    model::{AirQualitySnapshot, Coordinates, GeocodedPlace, WeatherSnapshot},
};

use super::{AirQualityClient, Geocoder, WeatherClient};

const WEATHER_PATH: &str = "/data/2.5/weather";
const AIR_POLLUTION_PATH: &str = "/data/2.5/air_pollution";
const GEOCODING_PATH: &str = "/geo/1.0/direct";

/// One HTTP client for the OpenWeather weather, air-pollution and geocoding endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, base_url: String, http: Client) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key()?.to_owned();
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::new(api_key, config.api_base_url.clone(), http))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, WidgetError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "OpenWeather request");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WidgetError::Network(format!(
                "OpenWeather request to {path} failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn coord_query(coords: Coordinates) -> [(&'static str, String); 2] {
    [
        ("lat", coords.lat().to_string()),
        ("lon", coords.lon().to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_max: f64,
    temp_min: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwAqiMain {
    aqi: i64,
}

#[derive(Debug, Deserialize)]
struct OwAirEntry {
    main: OwAqiMain,
}

#[derive(Debug, Deserialize)]
struct OwAirResponse {
    list: Vec<OwAirEntry>,
}

impl OwCurrentResponse {
    fn into_snapshot(self) -> Result<WeatherSnapshot, WidgetError> {
        if self.main.humidity > 100 {
            return Err(WidgetError::MalformedResponse(format!(
                "humidity {} is outside 0-100",
                self.main.humidity
            )));
        }

        let icon_code = self
            .weather
            .into_iter()
            .next()
            .map(|w| w.icon)
            .filter(|icon| !icon.is_empty() && icon.chars().all(|c| c.is_ascii_alphanumeric()))
            .ok_or_else(|| {
                WidgetError::MalformedResponse("missing or invalid weather[0].icon".to_string())
            })?;

        Ok(WeatherSnapshot {
            temperature_k: self.main.temp,
            temp_max_k: self.main.temp_max,
            temp_min_k: self.main.temp_min,
            feels_like_k: self.main.feels_like,
            wind_speed_mps: self.wind.speed,
            humidity_pct: self.main.humidity,
            icon_code,
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[instrument(skip(self, coords), fields(lat = %coords.lat(), lon = %coords.lon()))]
    async fn fetch_weather(&self, coords: Coordinates) -> Result<WeatherSnapshot, WidgetError> {
        let parsed: OwCurrentResponse = self.get_json(WEATHER_PATH, &coord_query(coords)).await?;
        parsed.into_snapshot()
    }
}

#[async_trait]
impl AirQualityClient for OpenWeatherClient {
    #[instrument(skip(self, coords), fields(lat = %coords.lat(), lon = %coords.lon()))]
    async fn fetch_air_quality(
        &self,
        coords: Coordinates,
    ) -> Result<AirQualitySnapshot, WidgetError> {
        let parsed: OwAirResponse = self
            .get_json(AIR_POLLUTION_PATH, &coord_query(coords))
            .await?;

        let entry = parsed
            .list
            .first()
            .ok_or(WidgetError::EmptyAirQualityData)?;

        Ok(AirQualitySnapshot {
            category: classify(entry.main.aqi)?,
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Geocoder for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn geocode(&self, city_name: &str) -> Result<Vec<GeocodedPlace>, WidgetError> {
        self.get_json(
            GEOCODING_PATH,
            &[("q", city_name.to_string()), ("limit", "1".to_string())],
        )
        .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
