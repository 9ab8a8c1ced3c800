//! The widget's state: last conditions, display unit, and which lookup may commit.
//!
//! Every lookup takes a fresh request id when it starts. When it finishes, its result is
//! applied only if no newer lookup has started in the meantime; otherwise it is dropped.
//! The unit toggle never fetches, it re-projects the stored snapshot.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    Config,
    error::WidgetError,
    location::{GeolocationSource, LocationResolver},
    model::{AirQualityStatus, Conditions},
    provider::{AirQualityClient, WeatherClient, providers_from_config},
    units::DisplayUnit,
    view::{RenderSink, ViewModel},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Monotonic per-session lookup token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RequestId(u64);

impl RequestId {
    fn next(self) -> Self {
        RequestId(self.0 + 1)
    }
}

/// What a lookup asks for. Kept so `refresh` can repeat it; coordinates are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupTarget {
    CurrentLocation,
    City(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// This lookup was the latest one and its result is now shown.
    Applied(ViewModel),
    /// A newer lookup started before this one finished; its result was dropped.
    Superseded,
    /// `refresh` was called before any lookup.
    NothingToRefresh,
}

#[derive(Debug, Default)]
struct SessionState {
    phase: SessionPhase,
    unit: DisplayUnit,
    latest_request: RequestId,
    last_target: Option<LookupTarget>,
    current: Option<Conditions>,
    last_error: Option<WidgetError>,
}

#[derive(Debug)]
struct SessionInner {
    resolver: LocationResolver,
    weather: Arc<dyn WeatherClient>,
    air_quality: Arc<dyn AirQualityClient>,
    sink: Arc<dyn RenderSink>,
    icon_base_url: String,
    state: Mutex<SessionState>,
}

/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone)]
pub struct WeatherSession {
    inner: Arc<SessionInner>,
}

impl WeatherSession {
    pub fn new(
        resolver: LocationResolver,
        weather: Arc<dyn WeatherClient>,
        air_quality: Arc<dyn AirQualityClient>,
        sink: Arc<dyn RenderSink>,
        icon_base_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                resolver,
                weather,
                air_quality,
                sink,
                icon_base_url: icon_base_url.into(),
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// Wires OpenWeather clients from `config` to the given position source and sink.
    pub fn from_config(
        config: &Config,
        geolocation: Option<Arc<dyn GeolocationSource>>,
        sink: Arc<dyn RenderSink>,
    ) -> anyhow::Result<Self> {
        let providers = providers_from_config(config)?;
        let resolver = LocationResolver::new(
            geolocation,
            providers.geocoder,
            config.geolocation_timeout(),
        );

        Ok(Self::new(
            resolver,
            providers.weather,
            providers.air_quality,
            sink,
            config.icon_base_url.clone(),
        ))
    }

    pub async fn lookup_current_location(&self) -> Result<LookupOutcome, WidgetError> {
        self.lookup(LookupTarget::CurrentLocation).await
    }

    pub async fn lookup_by_name(&self, city_name: &str) -> Result<LookupOutcome, WidgetError> {
        self.lookup(LookupTarget::City(city_name.to_string())).await
    }

    /// Repeats the most recently started lookup.
    pub async fn refresh(&self) -> Result<LookupOutcome, WidgetError> {
        let target = self.inner.state.lock().last_target.clone();
        match target {
            Some(target) => self.lookup(target).await,
            None => Ok(LookupOutcome::NothingToRefresh),
        }
    }

    /// Flips the display unit and re-renders the stored snapshot.
    ///
    /// Does nothing and returns `None` while no lookup has succeeded yet.
    pub fn toggle_unit(&self) -> Option<ViewModel> {
        let mut state = self.inner.state.lock();
        let conditions = state.current.as_ref()?;

        let unit = state.unit.toggled();
        let view = ViewModel::project(conditions, unit, &self.inner.icon_base_url);

        state.unit = unit;
        if state.phase == SessionPhase::Failed {
            state.phase = SessionPhase::Ready;
        }
        debug!(%unit, "Display unit toggled");

        self.inner.sink.render(&view);
        Some(view)
    }

    /// Chooses the display unit outright, e.g. from a startup flag. Re-renders only when a
    /// snapshot is shown and the unit actually changes.
    pub fn set_unit(&self, unit: DisplayUnit) -> Option<ViewModel> {
        let mut state = self.inner.state.lock();
        if state.unit == unit {
            return None;
        }
        state.unit = unit;

        let view = state
            .current
            .as_ref()
            .map(|c| ViewModel::project(c, unit, &self.inner.icon_base_url))?;
        self.inner.sink.render(&view);
        Some(view)
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state.lock().phase
    }

    pub fn unit(&self) -> DisplayUnit {
        self.inner.state.lock().unit
    }

    pub fn current(&self) -> Option<Conditions> {
        self.inner.state.lock().current.clone()
    }

    pub fn last_error(&self) -> Option<WidgetError> {
        self.inner.state.lock().last_error.clone()
    }

    /// The stored snapshot projected in the current unit.
    pub fn view_model(&self) -> Option<ViewModel> {
        let state = self.inner.state.lock();
        state
            .current
            .as_ref()
            .map(|c| ViewModel::project(c, state.unit, &self.inner.icon_base_url))
    }

    async fn lookup(&self, target: LookupTarget) -> Result<LookupOutcome, WidgetError> {
        let id = self.begin(&target);
        let result = self.fetch_conditions(&target).await;
        self.commit(id, result)
    }

    fn begin(&self, target: &LookupTarget) -> RequestId {
        let mut state = self.inner.state.lock();
        let id = state.latest_request.next();
        state.latest_request = id;
        state.phase = SessionPhase::Loading;
        state.last_target = Some(target.clone());
        info!(request = id.0, ?target, "Lookup started");
        id
    }

    async fn fetch_conditions(&self, target: &LookupTarget) -> Result<Conditions, WidgetError> {
        let resolver = &self.inner.resolver;
        let coords = match target {
            LookupTarget::CurrentLocation => resolver.resolve_current_location().await?,
            LookupTarget::City(name) => resolver.resolve_by_name(name).await?,
        };

        let (weather, air_quality) = tokio::join!(
            self.inner.weather.fetch_weather(coords),
            self.inner.air_quality.fetch_air_quality(coords),
        );

        let air_quality = AirQualityStatus::from(air_quality);
        if let AirQualityStatus::Unavailable(err) = &air_quality {
            if err.is_recoverable() {
                debug!("No air quality entries for this location");
            } else {
                warn!(error = %err, "Air quality lookup failed, showing weather without it");
            }
        }

        Ok(Conditions {
            weather: weather?,
            air_quality,
        })
    }

    fn commit(
        &self,
        id: RequestId,
        result: Result<Conditions, WidgetError>,
    ) -> Result<LookupOutcome, WidgetError> {
        let mut state = self.inner.state.lock();
        if id != state.latest_request {
            debug!(
                request = id.0,
                latest = state.latest_request.0,
                "Discarding result of superseded lookup"
            );
            return Ok(LookupOutcome::Superseded);
        }

        match result {
            Ok(conditions) => {
                let view = ViewModel::project(&conditions, state.unit, &self.inner.icon_base_url);
                state.current = Some(conditions);
                state.last_error = None;
                state.phase = SessionPhase::Ready;
                info!(request = id.0, "Lookup applied");

                self.inner.sink.render(&view);
                Ok(LookupOutcome::Applied(view))
            }
            Err(err) => {
                state.phase = SessionPhase::Failed;
                state.last_error = Some(err.clone());
                warn!(request = id.0, error = %err, "Lookup failed");

                self.inner.sink.render_error(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        location::FixedPosition,
        model::{AirQualitySnapshot, Coordinates, GeocodedPlace, WeatherSnapshot},
        provider::Geocoder,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::{collections::HashMap, time::Duration};
    use tokio::sync::oneshot;

    /// Maps city names to coordinates whose latitude doubles as the temperature offset.
    #[derive(Debug)]
    struct FakeGeocoder;

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, city_name: &str) -> Result<Vec<GeocodedPlace>, WidgetError> {
            let lat = match city_name {
                "Alpha" => 10.0,
                "Beta" => 20.0,
                "Gamma" => 30.0,
                "Broken" => 40.0,
                _ => return Ok(Vec::new()),
            };
            Ok(vec![GeocodedPlace {
                name: city_name.to_string(),
                lon: 0.0,
                lat,
            }])
        }
    }

    /// Reports `273.15 + lat` Kelvin. Latitude 40 fails. Gated latitudes wait for a signal.
    #[derive(Debug, Default)]
    struct FakeWeather {
        gates: parking_lot::Mutex<HashMap<u64, oneshot::Receiver<()>>>,
    }

    impl FakeWeather {
        fn gate(&self, lat: f64) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().insert(lat.to_bits(), rx);
            tx
        }
    }

    #[async_trait]
    impl WeatherClient for FakeWeather {
        async fn fetch_weather(&self, coords: Coordinates) -> Result<WeatherSnapshot, WidgetError> {
            let gate = self.gates.lock().remove(&coords.lat().to_bits());
            if let Some(rx) = gate {
                let _ = rx.await;
            }
            if coords.lat() == 40.0 {
                return Err(WidgetError::Network("connection reset".into()));
            }
            Ok(WeatherSnapshot {
                temperature_k: 273.15 + coords.lat(),
                temp_max_k: 302.0,
                temp_min_k: 298.0,
                feels_like_k: 301.0,
                wind_speed_mps: 5.0,
                humidity_pct: 40,
                icon_code: "01d".to_string(),
                fetched_at: Utc::now(),
            })
        }
    }

    #[derive(Debug)]
    struct FakeAir(Result<i64, WidgetError>);

    #[async_trait]
    impl AirQualityClient for FakeAir {
        async fn fetch_air_quality(
            &self,
            _coords: Coordinates,
        ) -> Result<AirQualitySnapshot, WidgetError> {
            let index = self.0.clone()?;
            Ok(AirQualitySnapshot {
                category: crate::air_quality::classify(index)?,
                fetched_at: Utc::now(),
            })
        }
    }

    #[derive(Debug, PartialEq)]
    enum Frame {
        View(ViewModel),
        Error(WidgetError),
    }

    #[derive(Debug, Default)]
    struct RecordingSink {
        frames: parking_lot::Mutex<Vec<Frame>>,
    }

    impl RenderSink for RecordingSink {
        fn render(&self, view: &ViewModel) {
            self.frames.lock().push(Frame::View(view.clone()));
        }

        fn render_error(&self, err: &WidgetError) {
            self.frames.lock().push(Frame::Error(err.clone()));
        }
    }

    struct Harness {
        session: WeatherSession,
        weather: Arc<FakeWeather>,
        sink: Arc<RecordingSink>,
    }

    fn harness_with(
        geolocation: Option<Arc<dyn GeolocationSource>>,
        air: Result<i64, WidgetError>,
    ) -> Harness {
        let weather = Arc::new(FakeWeather::default());
        let sink = Arc::new(RecordingSink::default());
        let resolver =
            LocationResolver::new(geolocation, Arc::new(FakeGeocoder), Duration::from_secs(1));
        let session = WeatherSession::new(
            resolver,
            weather.clone(),
            Arc::new(FakeAir(air)),
            sink.clone(),
            "https://openweathermap.org/img/wn",
        );
        Harness {
            session,
            weather,
            sink,
        }
    }

    fn harness() -> Harness {
        harness_with(None, Ok(2))
    }

    #[tokio::test]
    async fn starts_idle_in_celsius() {
        let h = harness();
        assert_eq!(h.session.phase(), SessionPhase::Idle);
        assert_eq!(h.session.unit(), DisplayUnit::Celsius);
        assert!(h.session.view_model().is_none());
    }

    #[tokio::test]
    async fn successful_lookup_becomes_ready_and_renders() {
        let h = harness();
        let outcome = h.session.lookup_by_name("Alpha").await.unwrap();

        let LookupOutcome::Applied(view) = outcome else {
            panic!("expected applied");
        };
        assert_eq!(view.temperature, "10°");
        assert_eq!(view.air_quality.text(), "Moderate: 2");
        assert_eq!(h.session.phase(), SessionPhase::Ready);
        assert_eq!(h.sink.frames.lock().as_slice(), &[Frame::View(view)]);
    }

    #[tokio::test]
    async fn unknown_city_fails_and_is_rendered() {
        let h = harness();
        let err = h.session.lookup_by_name("Atlantis").await.unwrap_err();

        assert_eq!(err, WidgetError::CityNotFound("Atlantis".into()));
        assert_eq!(h.session.phase(), SessionPhase::Failed);
        assert_eq!(h.session.last_error(), Some(err.clone()));
        assert_eq!(h.sink.frames.lock().as_slice(), &[Frame::Error(err)]);
    }

    #[tokio::test]
    async fn weather_failure_keeps_previous_snapshot() {
        let h = harness();
        h.session.lookup_by_name("Alpha").await.unwrap();
        let err = h.session.lookup_by_name("Broken").await.unwrap_err();

        assert!(matches!(err, WidgetError::Network(_)));
        assert_eq!(h.session.phase(), SessionPhase::Failed);
        assert_eq!(
            h.session.current().map(|c| c.weather.temperature_k),
            Some(273.15 + 10.0)
        );
    }

    #[tokio::test]
    async fn session_recovers_after_failure() {
        let h = harness();
        h.session.lookup_by_name("Atlantis").await.unwrap_err();
        h.session.lookup_by_name("Beta").await.unwrap();

        assert_eq!(h.session.phase(), SessionPhase::Ready);
        assert_eq!(h.session.last_error(), None);
    }

    #[tokio::test]
    async fn empty_air_quality_degrades_only_that_field() {
        let h = harness_with(None, Err(WidgetError::EmptyAirQualityData));
        let outcome = h.session.lookup_by_name("Alpha").await.unwrap();

        let LookupOutcome::Applied(view) = outcome else {
            panic!("expected applied");
        };
        assert_eq!(view.air_quality.text(), "Air quality data not available");
        assert_eq!(h.session.phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn out_of_range_air_quality_is_surfaced_not_fatal() {
        let h = harness_with(None, Ok(7));
        h.session.lookup_by_name("Alpha").await.unwrap();

        let view = h.session.view_model().unwrap();
        assert_eq!(
            view.air_quality,
            crate::view::AirQualityView::Unavailable(WidgetError::InvalidAirQualityIndex(7))
        );
        assert_eq!(h.session.phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn toggle_without_snapshot_is_a_no_op() {
        let h = harness();
        assert!(h.session.toggle_unit().is_none());
        assert_eq!(h.session.unit(), DisplayUnit::Celsius);
        assert!(h.sink.frames.lock().is_empty());
    }

    #[tokio::test]
    async fn toggling_back_and_forth_is_idempotent() {
        let h = harness();
        let LookupOutcome::Applied(original) = h.session.lookup_by_name("Gamma").await.unwrap()
        else {
            panic!("expected applied");
        };

        for _ in 0..25 {
            let fahrenheit = h.session.toggle_unit().unwrap();
            assert_eq!(fahrenheit.unit, DisplayUnit::Fahrenheit);
            assert_eq!(fahrenheit.temperature, "86°F");

            let celsius = h.session.toggle_unit().unwrap();
            assert_eq!(celsius, original);
        }
    }

    #[tokio::test]
    async fn toggle_from_failed_uses_last_good_snapshot() {
        let h = harness();
        h.session.lookup_by_name("Alpha").await.unwrap();
        h.session.lookup_by_name("Atlantis").await.unwrap_err();
        assert_eq!(h.session.phase(), SessionPhase::Failed);

        let view = h.session.toggle_unit().unwrap();
        assert_eq!(view.temperature, "50°F");
        assert_eq!(h.session.phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn set_unit_before_first_lookup_applies_to_it() {
        let h = harness();
        assert!(h.session.set_unit(DisplayUnit::Fahrenheit).is_none());
        assert!(h.sink.frames.lock().is_empty());

        let LookupOutcome::Applied(view) = h.session.lookup_by_name("Alpha").await.unwrap() else {
            panic!("expected applied");
        };
        assert_eq!(view.temperature, "50°F");
        assert!(h.session.set_unit(DisplayUnit::Fahrenheit).is_none());
        assert_eq!(h.session.set_unit(DisplayUnit::Celsius).unwrap().temperature, "10°");
    }

    #[tokio::test]
    async fn unit_persists_across_lookups() {
        let h = harness();
        h.session.lookup_by_name("Alpha").await.unwrap();
        h.session.toggle_unit();

        let LookupOutcome::Applied(view) = h.session.lookup_by_name("Beta").await.unwrap() else {
            panic!("expected applied");
        };
        assert_eq!(view.temperature, "68°F");
    }

    #[tokio::test]
    async fn stale_result_arriving_late_is_discarded() {
        let h = harness();
        let release_alpha = h.weather.gate(10.0);

        let (alpha, beta) = tokio::join!(h.session.lookup_by_name("Alpha"), async {
            let beta = h.session.lookup_by_name("Beta").await;
            let _ = release_alpha.send(());
            beta
        });

        assert_eq!(alpha.unwrap(), LookupOutcome::Superseded);
        assert!(matches!(beta.unwrap(), LookupOutcome::Applied(_)));
        assert_eq!(h.session.view_model().unwrap().temperature, "20°");
        assert_eq!(h.sink.frames.lock().len(), 1);
    }

    #[tokio::test]
    async fn stale_result_arriving_early_is_discarded() {
        let h = harness();
        let release_alpha = h.weather.gate(10.0);
        let release_beta = h.weather.gate(20.0);

        let (alpha, beta, ()) = tokio::join!(
            async {
                let alpha = h.session.lookup_by_name("Alpha").await;
                assert_eq!(h.session.phase(), SessionPhase::Loading);
                let _ = release_beta.send(());
                alpha
            },
            h.session.lookup_by_name("Beta"),
            async {
                let _ = release_alpha.send(());
            },
        );

        assert_eq!(alpha.unwrap(), LookupOutcome::Superseded);
        assert!(matches!(beta.unwrap(), LookupOutcome::Applied(_)));
        assert_eq!(h.session.view_model().unwrap().temperature, "20°");
        assert_eq!(h.sink.frames.lock().len(), 1);
    }

    #[tokio::test]
    async fn stale_failure_does_not_mark_session_failed() {
        let h = harness();
        let release_broken = h.weather.gate(40.0);

        let (broken, beta) = tokio::join!(h.session.lookup_by_name("Broken"), async {
            let beta = h.session.lookup_by_name("Beta").await;
            let _ = release_broken.send(());
            beta
        });

        assert_eq!(broken, Ok(LookupOutcome::Superseded));
        assert!(beta.is_ok());
        assert_eq!(h.session.phase(), SessionPhase::Ready);
        assert_eq!(h.session.last_error(), None);
    }

    #[tokio::test]
    async fn current_location_lookup() {
        let here = Coordinates::new(0.0, 15.0).unwrap();
        let h = harness_with(Some(Arc::new(FixedPosition(here))), Ok(1));

        let LookupOutcome::Applied(view) = h.session.lookup_current_location().await.unwrap()
        else {
            panic!("expected applied");
        };
        assert_eq!(view.temperature, "15°");
        assert_eq!(view.air_quality.text(), "GOOD: 1");
    }

    #[tokio::test]
    async fn current_location_without_capability_fails() {
        let h = harness();
        assert_eq!(
            h.session.lookup_current_location().await,
            Err(WidgetError::GeolocationUnavailable)
        );
        assert_eq!(h.session.phase(), SessionPhase::Failed);
    }

    #[tokio::test]
    async fn refresh_repeats_last_target() {
        let h = harness();
        assert_eq!(
            h.session.refresh().await,
            Ok(LookupOutcome::NothingToRefresh)
        );

        h.session.lookup_by_name("Beta").await.unwrap();
        let LookupOutcome::Applied(view) = h.session.refresh().await.unwrap() else {
            panic!("expected applied");
        };
        assert_eq!(view.temperature, "20°");
        assert_eq!(h.sink.frames.lock().len(), 2);
    }

    #[test]
    fn from_config_requires_api_key() {
        let sink = Arc::new(RecordingSink::default());
        let err = WeatherSession::from_config(&Config::default(), None, sink).unwrap_err();
        assert!(err.to_string().contains("No OpenWeather API key configured"));
    }

    #[test]
    fn request_ids_increase() {
        let first = RequestId::default().next();
        assert!(first.next() > first);
    }
}
