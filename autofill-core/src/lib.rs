//! Core library for weather form autofill.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather lookup abstraction and its OpenWeather implementation
//! - Form and alert seams, and the binder that connects them
//!
//! It is used by `autofill-cli`, but the binder can drive any form that
//! implements [`FormFields`].

pub mod binder;
pub mod config;
pub mod error;
pub mod form;
pub mod model;
pub mod provider;

pub use binder::{AutofillBinder, FieldEvent, OrderingPolicy, TriggerOutcome};
pub use config::{Config, FormConfig, OpenWeatherConfig};
pub use error::{LOOKUP_FAILED_MESSAGE, LookupFailed};
pub use form::{Alert, FormFields, InMemoryForm};
pub use model::{CityQuery, FieldId, FormFieldBinding, WeatherResult};
pub use provider::{WeatherLookup, openweather::OpenWeatherProvider, provider_from_config};
