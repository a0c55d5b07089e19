use crate::{
    Config, CityQuery, LookupFailed, WeatherResult, provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// A source of current weather for a city.
///
/// Every failure is reported as [`LookupFailed`]; implementations must not
/// cache, retry or throttle. Each call is one request.
#[async_trait]
pub trait WeatherLookup: Send + Sync + Debug {
    async fn lookup(&self, city: &CityQuery) -> Result<WeatherResult, LookupFailed>;
}

/// Construct the OpenWeather lookup from config.
///
/// Fails when no API key is available from the environment or the config file.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherLookup>> {
    let api_key = config.require_api_key()?;
    let provider = OpenWeatherProvider::from_config(api_key, &config.openweather)?;

    Ok(Arc::new(provider))
}
