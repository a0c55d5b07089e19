use reqwest::StatusCode;
use thiserror::Error;

/// Text shown to the user whenever a lookup fails, whatever the cause.
pub const LOOKUP_FAILED_MESSAGE: &str =
    "⚠️ Unable to fetch weather for this city. Please check the name.";

/// The only error a weather lookup produces.
///
/// Network errors, rejected cities, exhausted quotas and malformed payloads
/// all collapse into this one value. The underlying cause is kept as the
/// error source for diagnostics but is not meant to be matched on.
#[derive(Debug, Error)]
#[error("weather lookup failed for city '{city}'")]
pub struct LookupFailed {
    city: String,
    #[source]
    cause: LookupCause,
}

impl LookupFailed {
    pub fn new(city: impl Into<String>, cause: LookupCause) -> Self {
        Self { city: city.into(), cause }
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    /// Fixed user-facing text.
    pub fn user_message(&self) -> &'static str {
        LOOKUP_FAILED_MESSAGE
    }
}

#[derive(Debug, Error)]
pub enum LookupCause {
    #[error("request could not be completed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service responded with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("response body is not a usable weather payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
