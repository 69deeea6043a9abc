use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    acquirer::{AcquisitionSettings, DEFAULT_FETCH_TIMEOUT, DEFAULT_LOCATION_TIMEOUT},
    model::{Coordinates, PostalCode},
    risk::RiskThresholds,
};

/// Credentials for the weather provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
}

/// Fixed device position. Absent means location is unavailable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub location_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub allow_synthetic: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            location_timeout_secs: DEFAULT_LOCATION_TIMEOUT.as_secs(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            allow_synthetic: true,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// postal_code = "78701"
///
/// [provider]
/// api_key = "..."
///
/// [location]
/// latitude = 30.27
/// longitude = -97.74
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Default postal code used when none is given on the command line.
    pub postal_code: Option<PostalCode>,
    pub provider: ProviderConfig,
    pub location: Option<LocationConfig>,
    pub acquisition: AcquisitionConfig,
    pub thresholds: RiskThresholds,
}

impl Config {
    pub fn api_key(&self) -> Option<&str> {
        self.provider.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.provider.api_key = Some(api_key);
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location.map(|l| Coordinates { latitude: l.latitude, longitude: l.longitude })
    }

    /// Acquisition settings derived from this config.
    pub fn acquisition_settings(&self) -> Result<AcquisitionSettings> {
        if !self.thresholds.is_valid() {
            return Err(anyhow!(
                "Invalid risk thresholds {:?}: expected finite values with caution < danger < extreme.",
                self.thresholds
            ));
        }

        Ok(AcquisitionSettings {
            location_timeout: Duration::from_secs(self.acquisition.location_timeout_secs),
            fetch_timeout: Duration::from_secs(self.acquisition.fetch_timeout_secs),
            allow_synthetic: self.acquisition.allow_synthetic,
            thresholds: self.thresholds,
        })
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

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

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

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
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the settings file holding the walk log.
    pub fn settings_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.data_dir().join("settings.json"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "heatpaw", "heatpaw")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
