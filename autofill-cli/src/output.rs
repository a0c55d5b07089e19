//! Human-readable rendering of lookup results and form state.

use autofill_core::{CityQuery, FieldId, FormFieldBinding, FormFields, WeatherResult};

pub fn render_weather(city: &CityQuery, weather: &WeatherResult) -> String {
    let mut lines = Vec::new();

    let place = weather.location.as_deref().unwrap_or(city.as_str());
    match &weather.description {
        Some(description) => lines.push(format!("{place}: {description}")),
        None => lines.push(place.to_string()),
    }

    lines.push(format!("  Temperature: {} °C", weather.temperature_text()));
    lines.push(format!("  Humidity:    {} %", weather.humidity_text()));
    lines.push(format!("  Rainfall:    {} mm", weather.rainfall_mm));

    if let Some(at) = weather.observed_at {
        lines.push(format!("  Observed:    {}", at.format("%Y-%m-%d %H:%M UTC")));
    }

    lines.join("\n")
}

pub fn render_form(form: &dyn FormFields, binding: &FormFieldBinding) -> String {
    let row = |label: &str, id: &FieldId, unit: &str| {
        let value = match form.value(id) {
            Some(v) if !v.is_empty() => format!("{v}{unit}"),
            _ => "-".to_string(),
        };
        format!("  {label:<12} {:<18} {value}", format!("[{id}]"))
    };

    [
        row("City", binding.city(), ""),
        row("Temperature", binding.temperature(), " °C"),
        row("Humidity", binding.humidity(), " %"),
    ]
    .join("\n")
}
