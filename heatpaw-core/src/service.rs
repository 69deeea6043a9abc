//! Entry points used by a presentation layer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    Config,
    acquirer::WeatherAcquirer,
    error::{AcquisitionError, InputError},
    history::{WalkLogEntry, WalkLogStore},
    location,
    model::{LocationHint, PostalCode, WeatherSnapshot},
    paw_check::{HoldTestHandle, PawCheckEvaluator, PawMethod, PawVerdict},
    provider::provider_from_config,
    settings::SettingsStore,
};

/// Optional details attached to a logged walk.
#[derive(Debug, Clone, Default)]
pub struct WalkDetails {
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
}

pub struct HeatPaw {
    acquirer: WeatherAcquirer,
    paw: Mutex<PawCheckEvaluator>,
    log: WalkLogStore,
}

impl HeatPaw {
    pub fn new(acquirer: WeatherAcquirer, paw: PawCheckEvaluator, log: WalkLogStore) -> Self {
        Self { acquirer, paw: Mutex::new(paw), log }
    }

    /// Wire the service from configuration. A missing API key is not an
    /// error: only the synthetic source remains.
    pub fn from_config(config: &Config, settings: impl SettingsStore + 'static) -> anyhow::Result<Self> {
        let provider = match provider_from_config(config) {
            Ok(provider) => Some(provider),
            Err(err) => {
                warn!(error = %err, "weather provider unavailable, live sources disabled");
                None
            }
        };

        let acquirer = WeatherAcquirer::new(
            provider,
            location::location_from(config.coordinates()),
            config.acquisition_settings()?,
        );

        Ok(Self::new(acquirer, PawCheckEvaluator::default(), WalkLogStore::new(settings)))
    }

    /// Current conditions, trying the live sources first. A malformed postal
    /// code is rejected before any source runs.
    pub async fn acquire_current(
        &self,
        postal_code: Option<&str>,
    ) -> Result<WeatherSnapshot, AcquisitionError> {
        let hint = match postal_code {
            Some(raw) => LocationHint::postal(raw.parse::<PostalCode>()?),
            None => LocationHint::default(),
        };
        self.acquire(&hint).await
    }

    pub async fn acquire(&self, hint: &LocationHint) -> Result<WeatherSnapshot, AcquisitionError> {
        self.acquirer.acquire_current(hint).await
    }

    /// Select a paw check mode and start it. Timed tests return a handle
    /// that resolves to the verdict.
    ///
    /// # Panics
    ///
    /// A timed test must be started from within a Tokio runtime.
    pub fn start_paw_check(&self, method: PawMethod) -> Option<HoldTestHandle> {
        self.paw().start(method)
    }

    /// The walker could not keep a hand on the surface.
    pub fn abort_paw_check(&self) -> bool {
        self.paw().abort()
    }

    pub fn submit_direct_reading(&self, text: &str) -> Result<PawVerdict, InputError> {
        self.paw().submit(text)
    }

    /// Persist the outcome of a paw check taken under `snapshot`. Returns the
    /// entry as logged, or `None` when it could not be logged.
    pub fn record_walk(
        &self,
        snapshot: &WeatherSnapshot,
        verdict: &PawVerdict,
        details: WalkDetails,
    ) -> Option<WalkLogEntry> {
        let mut entry = WalkLogEntry::from_check(snapshot, verdict, Utc::now());
        if let Some(minutes) = details.duration_minutes {
            entry = entry.with_duration(minutes);
        }
        if let Some(notes) = details.notes {
            entry = entry.with_notes(notes);
        }

        let entry = self.log.append(entry)?;
        info!(id = %entry.id, risk = %entry.risk, "walk recorded");
        Some(entry)
    }

    /// Logged walks, newest first.
    pub fn history(&self) -> Vec<WalkLogEntry> {
        self.log.list_recent_first()
    }

    pub fn clear_history(&self) {
        self.log.clear();
    }

    fn paw(&self) -> MutexGuard<'_, PawCheckEvaluator> {
        self.paw.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
