//! Turning "where am I" or a typed city name into coordinates.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::{debug, info, instrument};

use crate::{error::WidgetError, model::Coordinates, provider::Geocoder};

/// The device's position capability.
///
/// Implementations suspend until the platform grants or denies access and report
/// denial as `GeolocationDenied`.
#[async_trait]
pub trait GeolocationSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, WidgetError>;
}

/// A position known up front, e.g. passed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl GeolocationSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, WidgetError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    geolocation: Option<Arc<dyn GeolocationSource>>,
    geocoder: Arc<dyn Geocoder>,
    geolocation_timeout: Duration,
}

impl LocationResolver {
    pub fn new(
        geolocation: Option<Arc<dyn GeolocationSource>>,
        geocoder: Arc<dyn Geocoder>,
        geolocation_timeout: Duration,
    ) -> Self {
        Self {
            geolocation,
            geocoder,
            geolocation_timeout,
        }
    }

    /// Asks the device for its position, waiting at most the configured timeout.
    #[instrument(skip(self))]
    pub async fn resolve_current_location(&self) -> Result<Coordinates, WidgetError> {
        let source = self
            .geolocation
            .as_ref()
            .ok_or(WidgetError::GeolocationUnavailable)?;

        let coords = tokio::time::timeout(self.geolocation_timeout, source.current_position())
            .await
            .map_err(|_| WidgetError::GeolocationTimeout)??;

        info!(%coords, "Resolved device location");
        Ok(coords)
    }

    /// Looks the name up and accepts the first result only if its name matches exactly,
    /// ignoring case. "Paris, TX" does not match "Paris".
    #[instrument(skip(self))]
    pub async fn resolve_by_name(&self, city_name: &str) -> Result<Coordinates, WidgetError> {
        let wanted = city_name.trim();
        if wanted.is_empty() {
            return Err(WidgetError::CityNotFound(city_name.to_string()));
        }

        let places = self.geocoder.geocode(wanted).await?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| WidgetError::CityNotFound(wanted.to_string()))?;

        if place.name.trim().to_lowercase() != wanted.to_lowercase() {
            debug!(found = %place.name, "Geocoder returned a different city");
            return Err(WidgetError::CityNotFound(wanted.to_string()));
        }

        let coords = Coordinates::new(place.lon, place.lat).map_err(|_| {
            WidgetError::MalformedResponse(format!(
                "geocoder returned out-of-range coordinates for {}",
                place.name
            ))
        })?;

        info!(%coords, city = %place.name, "Resolved city");
        Ok(coords)
    }
}
