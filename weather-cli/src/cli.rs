use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::InquireError;
use weather_widget_core::{
    Config, Coordinates, DisplayUnit, FixedPosition, GeolocationSource, LookupOutcome,
    WeatherSession,
};

use crate::sink::TerminalSink;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-widget", version, about = "Current weather and air quality")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Show weather for a city.
    Show {
        /// City name; must match the geocoder's name exactly (case-insensitive).
        city: String,

        #[command(flatten)]
        unit: UnitArgs,
    },

    /// Show weather for a position given as coordinates.
    Here {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        #[command(flatten)]
        unit: UnitArgs,
    },

    /// Keep a session open: type city names, `t` to toggle the unit, `r` to refresh, `q` to quit.
    Interactive {
        /// Latitude to autoload on start.
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,

        /// Longitude to autoload on start.
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,

        #[command(flatten)]
        unit: UnitArgs,
    },
}

#[derive(Debug, Clone, Copy, Args)]
pub struct UnitArgs {
    /// Show temperatures in Fahrenheit instead of Celsius.
    #[arg(long, short = 'f')]
    pub fahrenheit: bool,
}

impl UnitArgs {
    fn unit(self) -> DisplayUnit {
        if self.fahrenheit {
            DisplayUnit::Fahrenheit
        } else {
            DisplayUnit::Celsius
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, unit } => {
                let session = build_session(None, unit)?;
                Ok(exit_code(session.lookup_by_name(&city).await.is_ok()))
            }
            Command::Here { lat, lon, unit } => {
                let session = build_session(Some(Coordinates::new(lon, lat)?), unit)?;
                Ok(exit_code(session.lookup_current_location().await.is_ok()))
            }
            Command::Interactive { lat, lon, unit } => {
                let position = match (lat, lon) {
                    (Some(lat), Some(lon)) => Some(Coordinates::new(lon, lat)?),
                    _ => None,
                };
                let session = build_session(position, unit)?;
                interactive(session, position.is_some()).await?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn configure() -> anyhow::Result<ExitCode> {
    let mut cfg = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    cfg.set_api_key(api_key);
    cfg.api_key()?;
    cfg.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(ExitCode::SUCCESS)
}

fn build_session(position: Option<Coordinates>, unit: UnitArgs) -> anyhow::Result<WeatherSession> {
    let cfg = Config::load()?;
    let geolocation =
        position.map(|coords| Arc::new(FixedPosition(coords)) as Arc<dyn GeolocationSource>);

    let session = WeatherSession::from_config(&cfg, geolocation, Arc::new(TerminalSink))?;
    session.set_unit(unit.unit());
    Ok(session)
}

enum Input {
    Toggle,
    Refresh,
    Quit,
    City(String),
    Nothing,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "" => Input::Nothing,
        "t" | "T" => Input::Toggle,
        "r" | "R" => Input::Refresh,
        "q" | "Q" => Input::Quit,
        city => Input::City(city.to_string()),
    }
}

async fn interactive(session: WeatherSession, autoload: bool) -> anyhow::Result<()> {
    if autoload {
        let background = session.clone();
        tokio::spawn(async move {
            if let Err(err) = background.lookup_current_location().await {
                tracing::debug!(error = %err, "Autoload of current location failed");
            }
        });
    }

    loop {
        let prompt = tokio::task::spawn_blocking(|| {
            inquire::Text::new("City (t = toggle unit, r = refresh, q = quit):").prompt()
        })
        .await
        .context("Prompt task failed")?;

        let line = match prompt {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read input"),
        };

        match parse_input(&line) {
            Input::Nothing => {}
            Input::Quit => break,
            Input::Toggle => {
                if session.toggle_unit().is_none() {
                    println!("Nothing to convert yet.\n");
                }
            }
            Input::Refresh => match session.refresh().await {
                Ok(LookupOutcome::NothingToRefresh) => println!("Nothing to refresh yet.\n"),
                Ok(_) => {}
                Err(err) => tracing::debug!(error = %err, "Refresh failed"),
            },
            Input::City(city) => {
                if let Err(err) = session.lookup_by_name(&city).await {
                    tracing::debug!(error = %err, "Lookup failed");
                }
            }
        }
    }

    Ok(())
}
