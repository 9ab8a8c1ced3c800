use chrono::Local;
use weather_widget_core::{RenderSink, ViewModel, WidgetError};

/// Prints each view-model as a small block of labelled lines on stdout.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl TerminalSink {
    pub fn format_view(view: &ViewModel) -> String {
        let air = if view.air_quality.emphasize() {
            format!("! {}", view.air_quality.text())
        } else {
            view.air_quality.text()
        };
        let updated = view.fetched_at.with_timezone(&Local).format("%H:%M");

        format!(
            "{temp}  {high} {low}\n\
             Feels like  {feels}\n\
             Wind        {wind}\n\
             Humidity    {humidity}\n\
             Air quality {air}\n\
             Icon        {icon}\n\
             ({unit}, updated {updated})",
            temp = view.temperature,
            high = view.high,
            low = view.low,
            feels = view.feels_like,
            wind = view.wind,
            humidity = view.humidity,
            icon = view.icon_url,
            unit = view.unit,
        )
    }
}

impl RenderSink for TerminalSink {
    fn render(&self, view: &ViewModel) {
        println!("{}\n", Self::format_view(view));
    }

    fn render_error(&self, err: &WidgetError) {
        println!("Could not load weather: {err}\n");
    }
}
