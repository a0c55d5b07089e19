use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, warn};

use crate::{
    config::{DEFAULT_ENDPOINT, OpenWeatherConfig},
    error::{LookupCause, LookupFailed},
    model::{CityQuery, WeatherResult},
};

use super::WeatherLookup;

#[derive(Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    endpoint: Url,
    country: Option<String>,
    http: Client,
}

impl fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .field("country", &self.country)
            .finish()
    }
}

impl OpenWeatherProvider {
    /// Provider against the public endpoint with transport defaults.
    pub fn new(api_key: String) -> Result<Self> {
        Self::from_config(api_key, &OpenWeatherConfig::default())
    }

    pub fn from_config(api_key: String, config: &OpenWeatherConfig) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint())
            .with_context(|| format!("Invalid OpenWeather endpoint: {}", config.endpoint()))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            endpoint,
            country: config.country.clone().filter(|c| !c.trim().is_empty()),
            http,
        })
    }

    /// Full current-weather URL for `city`, credential and metric units included.
    pub fn request_url(&self, city: &CityQuery) -> Url {
        let q = match &self.country {
            Some(country) => format!("{city},{country}"),
            None => city.to_string(),
        };

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &q)
            .append_pair("appid", &self.api_key)
            .append_pair("units", "metric");
        url
    }

    async fn fetch_current(
        &self,
        city: &CityQuery,
    ) -> std::result::Result<WeatherResult, LookupCause> {
        debug!(%city, endpoint = %self.endpoint, "requesting current weather");

        // The URL carries the credential; keep it out of error text.
        let res = self
            .http
            .get(self.request_url(city))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = res.status();
        let body = res.text().await.map_err(reqwest::Error::without_url)?;

        if !status.is_success() {
            return Err(LookupCause::Status { status, body: truncate_body(&body) });
        }

        let core: OwCurrentResponse = serde_json::from_str(&body)?;
        // Extras are best effort and never fail the lookup.
        let extras: OwExtras = serde_json::from_str(&body).unwrap_or_default();

        let description = extras.weather.into_iter().next().map(|w| w.description);
        let rainfall_mm = rainfall_mm(extras.rain.as_ref(), description.as_deref());

        Ok(WeatherResult {
            temperature: core.main.temp,
            humidity: core.main.humidity,
            location: extras.name,
            description,
            rainfall_mm,
            observed_at: extras.dt.and_then(unix_to_utc),
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
    #[serde(rename = "24h")]
    one_day: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwExtras {
    name: Option<String>,
    dt: Option<i64>,
    #[serde(default)]
    weather: Vec<OwWeather>,
    rain: Option<OwRain>,
}

#[async_trait]
impl WeatherLookup for OpenWeatherProvider {
    async fn lookup(&self, city: &CityQuery) -> std::result::Result<WeatherResult, LookupFailed> {
        self.fetch_current(city).await.map_err(|cause| {
            warn!(%city, error = %cause, "OpenWeather lookup failed");
            LookupFailed::new(city.as_str(), cause)
        })
    }
}

/// Rain volume for the shortest reported window. With no volume reported but
/// a rainy description, assume light rain.
fn rainfall_mm(rain: Option<&OwRain>, description: Option<&str>) -> f64 {
    const LIGHT_RAIN_MM: f64 = 0.5;

    let reported = rain
        .and_then(|r| r.one_hour.or(r.three_hours).or(r.one_day))
        .unwrap_or(0.0);

    let rainy = description.is_some_and(|d| {
        let d = d.to_lowercase();
        ["rain", "drizzle", "shower"].iter().any(|w| d.contains(w))
    });

    if reported == 0.0 && rainy { LIGHT_RAIN_MM } else { reported }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
