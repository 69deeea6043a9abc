//! Current-conditions acquisition chain.
//!
//! Sources are tried strictly in order: device location, then the caller's
//! postal code, then a synthetic fallback. A failing source is logged and
//! skipped; only when every source is exhausted does the call fail.

use std::{future::Future, time::Duration};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    advisor,
    error::{AcquisitionError, SourceError},
    location::{LocationProvider, Permission},
    model::{LocationHint, PostalCode, RawWeather, SourceMethod, WeatherSnapshot},
    provider::WeatherProvider,
    risk::{self, RiskThresholds},
};

pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    pub location_timeout: Duration,
    pub fetch_timeout: Duration,
    /// Fall back to synthetic data when live sources fail.
    pub allow_synthetic: bool,
    pub thresholds: RiskThresholds,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            location_timeout: DEFAULT_LOCATION_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            allow_synthetic: true,
            thresholds: RiskThresholds::default(),
        }
    }
}

/// Fixed conditions used when no live source is available.
pub fn synthetic_weather() -> RawWeather {
    RawWeather {
        temperature_f: 95.0,
        humidity_pct: 70.0,
        condition: "Sunny".to_string(),
        location: "Mockville, USA".to_string(),
    }
}

pub struct WeatherAcquirer {
    provider: Option<Box<dyn WeatherProvider>>,
    location: Box<dyn LocationProvider>,
    settings: AcquisitionSettings,
}

impl WeatherAcquirer {
    /// `provider` may be absent (e.g. no API key), leaving only the
    /// synthetic source.
    pub fn new(
        provider: Option<Box<dyn WeatherProvider>>,
        location: Box<dyn LocationProvider>,
        settings: AcquisitionSettings,
    ) -> Self {
        Self { provider, location, settings }
    }

    pub async fn acquire_current(
        &self,
        hint: &LocationHint,
    ) -> Result<WeatherSnapshot, AcquisitionError> {
        let mut failures: Vec<String> = Vec::new();

        if hint.force_synthetic {
            debug!("synthetic data requested, skipping live sources");
        } else {
            match self.try_geo().await {
                Ok(raw) => return Ok(self.build(raw, SourceMethod::Geo)),
                Err(err) => {
                    warn!(source = "geo", error = %err, "weather source exhausted");
                    failures.push(format!("geo: {err}"));
                }
            }

            if let Some(code) = &hint.postal_code {
                match self.try_postal_code(code).await {
                    Ok(raw) => return Ok(self.build(raw, SourceMethod::PostalCode)),
                    Err(err) => {
                        warn!(source = "postal-code", %code, error = %err, "weather source exhausted");
                        failures.push(format!("postal code {code}: {err}"));
                    }
                }
            } else {
                debug!("no postal code supplied, skipping postal-code source");
            }
        }

        if hint.force_synthetic || self.settings.allow_synthetic {
            return Ok(self.build(synthetic_weather(), SourceMethod::Synthetic));
        }

        Err(AcquisitionError::AllSourcesExhausted {
            reason: if failures.is_empty() {
                "no sources configured".to_string()
            } else {
                failures.join("; ")
            },
        })
    }

    async fn try_geo(&self) -> Result<RawWeather, SourceError> {
        let mut permission = self.location.permission_status().await;
        if permission == Permission::Undetermined {
            permission = self.location.request_permission().await;
        }
        if permission != Permission::Granted {
            return Err(SourceError::PermissionDenied);
        }

        let provider = self.provider()?;
        let coords =
            bounded(self.settings.location_timeout, self.location.current_location()).await?;
        debug!(lat = coords.latitude, lon = coords.longitude, "device location acquired");

        bounded(self.settings.fetch_timeout, async {
            provider.fetch_by_coordinates(coords).await.map_err(SourceError::from)
        })
        .await
    }

    async fn try_postal_code(&self, code: &PostalCode) -> Result<RawWeather, SourceError> {
        let provider = self.provider()?;
        bounded(self.settings.fetch_timeout, async {
            provider.fetch_by_postal_code(code).await.map_err(SourceError::from)
        })
        .await
    }

    fn provider(&self) -> Result<&dyn WeatherProvider, SourceError> {
        self.provider
            .as_deref()
            .ok_or_else(|| SourceError::Unavailable("no weather provider configured".to_string()))
    }

    fn build(&self, raw: RawWeather, source: SourceMethod) -> WeatherSnapshot {
        let heat = risk::evaluate_with(&self.settings.thresholds, raw.temperature_f, raw.humidity_pct);
        let walk_windows = advisor::recommend(raw.temperature_f);

        info!(
            %source,
            temperature_f = raw.temperature_f,
            heat_index_f = heat.heat_index_f,
            tier = %heat.risk_tier,
            "weather snapshot acquired"
        );

        WeatherSnapshot {
            temperature_f: raw.temperature_f,
            humidity_pct: raw.humidity_pct,
            condition: raw.condition,
            location: raw.location,
            captured_at: Utc::now(),
            source,
            heat,
            walk_windows,
        }
    }
}

/// Apply a fixed deadline; expiry counts as a source failure.
async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    tokio::time::timeout(limit, fut).await.unwrap_or(Err(SourceError::Timeout(limit)))
}
