use std::path::PathBuf;

use anyhow::{Context, bail};
use autofill_core::{CityQuery, Config, OrderingPolicy, WeatherLookup, provider_from_config};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};

use crate::{output, session};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "autofill", version, about = "Weather autofill for city forms")]
pub struct Cli {
    /// Read and write this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and optional country qualifier.
    Configure,

    /// Look up current weather for one city.
    Lookup {
        /// City name, as it would be typed into the form.
        city: String,
    },

    /// Fill in a form interactively; temperature and humidity follow the city.
    Form {
        /// Ignore responses from lookups that were overtaken by a newer one.
        #[arg(long)]
        latest_wins: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        match self.command {
            Command::Configure => configure(config, self.config.as_deref()),
            Command::Lookup { city } => lookup(&config, city).await,
            Command::Form { latest_wins } => {
                let ordering = if latest_wins { OrderingPolicy::LatestWins } else { config.ordering };
                session::run(&config, ordering).await
            }
        }
    }
}

fn configure(mut config: Config, path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    let country = Text::new("Country qualifier (optional, e.g. IN):")
        .with_default(config.openweather.country.as_deref().unwrap_or_default())
        .prompt()
        .context("Failed to read country qualifier")?;

    config.set_api_key(api_key.trim().to_string());
    config.openweather.country = Some(country.trim().to_string()).filter(|c| !c.is_empty());

    match path {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }

    let shown = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_file_path()?,
    };
    println!("Saved configuration to {}", shown.display());

    Ok(())
}

async fn lookup(config: &Config, city: String) -> anyhow::Result<()> {
    let city = CityQuery::new(city);
    if !city.is_lookupable() {
        bail!("City name must be longer than 2 characters, got '{city}'");
    }

    let provider = provider_from_config(config)?;

    match provider.lookup(&city).await {
        Ok(weather) => {
            println!("{}", output::render_weather(&city, &weather));
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err.user_message());
            Err(err.into())
        }
    }
}
