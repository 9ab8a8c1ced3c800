//! Display-ready projection of the stored conditions.
//!
//! A [`ViewModel`] is rebuilt from the canonical snapshot every time it is needed and is
//! never read back. Toggling the unit therefore cannot accumulate rounding error.

use chrono::{DateTime, Utc};

use crate::{
    air_quality::AirQualityCategory,
    error::WidgetError,
    model::{AirQualityStatus, Conditions},
    units::{DisplayUnit, format_wind},
};

#[derive(Debug, Clone, PartialEq)]
pub enum AirQualityView {
    Rated(AirQualityCategory),
    Unavailable(WidgetError),
}

impl AirQualityView {
    /// Text for the air-quality field, e.g. `Moderate: 2`.
    pub fn text(&self) -> String {
        match self {
            AirQualityView::Rated(category) => format!("{}: {}", category.label(), category.index()),
            AirQualityView::Unavailable(err) => err.to_string(),
        }
    }

    pub fn emphasize(&self) -> bool {
        matches!(self, AirQualityView::Rated(category) if category.emphasize())
    }
}

impl From<&AirQualityStatus> for AirQualityView {
    fn from(status: &AirQualityStatus) -> Self {
        match status {
            AirQualityStatus::Available(snapshot) => AirQualityView::Rated(snapshot.category),
            AirQualityStatus::Unavailable(err) => AirQualityView::Unavailable(err.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub unit: DisplayUnit,
    pub temperature: String,
    pub high: String,
    pub low: String,
    pub feels_like: String,
    pub wind: String,
    pub humidity: String,
    pub air_quality: AirQualityView,
    pub icon_url: String,
    pub fetched_at: DateTime<Utc>,
}

impl ViewModel {
    pub fn project(conditions: &Conditions, unit: DisplayUnit, icon_base_url: &str) -> Self {
        let weather = &conditions.weather;

        Self {
            unit,
            temperature: unit.format_kelvin(weather.temperature_k),
            high: format!("H:{}", unit.format_kelvin(weather.temp_max_k)),
            low: format!("L:{}", unit.format_kelvin(weather.temp_min_k)),
            feels_like: unit.format_kelvin(weather.feels_like_k),
            wind: format_wind(weather.wind_speed_mps),
            humidity: format!("{}%", weather.humidity_pct),
            air_quality: AirQualityView::from(&conditions.air_quality),
            icon_url: icon_url(icon_base_url, &weather.icon_code),
            fetched_at: weather.fetched_at,
        }
    }
}

/// `{base}/{code}.png`
pub fn icon_url(base: &str, icon_code: &str) -> String {
    format!("{}/{}.png", base.trim_end_matches('/'), icon_code)
}

/// Where view-models and failures end up. Implementations must not call back into the
/// session that drives them.
pub trait RenderSink: Send + Sync + std::fmt::Debug {
    fn render(&self, view: &ViewModel);

    fn render_error(&self, err: &WidgetError);
}
