use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::model::{Coordinates, PostalCode, RawWeather};

use super::WeatherProvider;

const CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// OpenWeatherMap current-conditions client, imperial units.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, CURRENT_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self { api_key, base_url, http: Client::new() }
    }

    async fn fetch_current(&self, query: &[(&str, String)]) -> Result<RawWeather> {
        debug!(url = %self.base_url, "requesting current conditions from OpenWeather");

        let res = self
            .http
            .get(&self.base_url)
            .query(query)
            .query(&[("appid", self.api_key.as_str()), ("units", "imperial")])
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather current request failed with status {}: {}",
                status,
                error_message(&body),
            ));
        }

        parse_current(&body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwError {
    message: Option<String>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_by_coordinates(&self, coords: Coordinates) -> Result<RawWeather> {
        self.fetch_current(&[
            ("lat", coords.latitude.to_string()),
            ("lon", coords.longitude.to_string()),
        ])
        .await
    }

    async fn fetch_by_postal_code(&self, code: &PostalCode) -> Result<RawWeather> {
        self.fetch_current(&[("zip", format!("{code},us"))]).await
    }
}

fn parse_current(body: &str) -> Result<RawWeather> {
    let parsed: OwCurrentResponse =
        serde_json::from_str(body).context("Failed to parse OpenWeather current JSON")?;

    let condition = parsed
        .weather
        .first()
        .map(|w| w.description.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(RawWeather {
        temperature_f: parsed.main.temp,
        humidity_pct: parsed.main.humidity,
        condition,
        location: parsed.name,
    })
}

/// Human-readable message from an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<OwError>(body) {
        Ok(OwError { message: Some(message) }) => message,
        _ => truncate_body(body),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else if body.is_empty() {
        "Failed to fetch weather data".to_string()
    } else {
        body.to_string()
    }
}
