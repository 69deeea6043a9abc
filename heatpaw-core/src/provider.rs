use crate::{
    Config,
    model::{Coordinates, PostalCode, RawWeather},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Remote source of current conditions. One request per call, no retries.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_by_coordinates(&self, coords: Coordinates) -> anyhow::Result<RawWeather>;

    async fn fetch_by_postal_code(&self, code: &PostalCode) -> anyhow::Result<RawWeather>;
}

/// Construct the configured provider.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for OpenWeather.\n\
                 Hint: run `heatpaw configure` and enter your API key."
        )
    })?;

    Ok(Box::new(OpenWeatherProvider::new(api_key.to_owned())))
}
