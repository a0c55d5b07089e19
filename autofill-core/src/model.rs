use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values of this length or shorter never trigger a lookup.
pub const MIN_CITY_LEN: usize = 2;

/// Content of the city field at the moment a trigger fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityQuery(String);

impl CityQuery {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in Unicode scalar values of the raw, untrimmed input.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this value is long enough to be looked up.
    pub fn is_lookupable(&self) -> bool {
        self.len() > MIN_CITY_LEN
    }
}

impl fmt::Display for CityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current conditions for a city, in metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    /// Ambient temperature in °C.
    pub temperature: f64,
    /// Relative humidity in %.
    pub humidity: f64,

    pub location: Option<String>,
    pub description: Option<String>,
    pub rainfall_mm: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

impl WeatherResult {
    /// Text written into the temperature field. No rounding or conversion.
    pub fn temperature_text(&self) -> String {
        self.temperature.to_string()
    }

    /// Text written into the humidity field.
    pub fn humidity_text(&self) -> String {
        self.humidity.to_string()
    }
}

/// Element identifier of a form field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The three fields an autofill binder works with. Fixed once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFieldBinding {
    city: FieldId,
    temperature: FieldId,
    humidity: FieldId,
}

impl FormFieldBinding {
    pub fn new(city: FieldId, temperature: FieldId, humidity: FieldId) -> Self {
        Self { city, temperature, humidity }
    }

    pub fn city(&self) -> &FieldId {
        &self.city
    }

    pub fn temperature(&self) -> &FieldId {
        &self.temperature
    }

    pub fn humidity(&self) -> &FieldId {
        &self.humidity
    }
}

impl Default for FormFieldBinding {
    fn default() -> Self {
        Self::new("id_city".into(), "id_temperature".into(), "id_humidity".into())
    }
}
