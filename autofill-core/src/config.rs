use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    binder::OrderingPolicy,
    model::{FieldId, FormFieldBinding},
};

/// Environment variable that takes precedence over the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Current-weather endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

/// OpenWeather connection settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,

    /// Override for the current-weather endpoint.
    pub endpoint: Option<String>,

    /// Country qualifier appended to every query, e.g. "IN" sends "Surat,IN".
    pub country: Option<String>,

    /// Request timeout. Unset leaves the HTTP client default in place.
    pub timeout_secs: Option<u64>,
}

impl OpenWeatherConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Element ids of the fields the binder reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub city_field: FieldId,
    pub temperature_field: FieldId,
    pub humidity_field: FieldId,
}

impl Default for FormConfig {
    fn default() -> Self {
        let binding = FormFieldBinding::default();
        Self {
            city_field: binding.city().clone(),
            temperature_field: binding.temperature().clone(),
            humidity_field: binding.humidity().clone(),
        }
    }
}

impl FormConfig {
    pub fn binding(&self) -> FormFieldBinding {
        FormFieldBinding::new(
            self.city_field.clone(),
            self.temperature_field.clone(),
            self.humidity_field.clone(),
        )
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// ordering = "latest-wins"
///
/// [openweather]
/// api_key = "..."
/// country = "IN"
///
/// [form]
/// city_field = "id_location"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ordering: OrderingPolicy,
    pub openweather: OpenWeatherConfig,
    pub form: FormConfig,
}

impl Config {
    /// Load config from the platform location, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from an explicit path, or defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-autofill", "autofill")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.openweather.api_key = Some(api_key);
    }

    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with_env(env::var(API_KEY_ENV).ok())
    }

    fn api_key_with_env(&self, from_env: Option<String>) -> Option<String> {
        from_env
            .or_else(|| self.openweather.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    /// Like [`Config::api_key`], but an error with a hint when nothing is configured.
    pub fn require_api_key(&self) -> Result<String> {
        self.api_key().ok_or_else(|| {
            anyhow!(
                "No OpenWeather API key configured.\n\
                 Hint: run `autofill configure` or set {API_KEY_ENV}."
            )
        })
    }
}
