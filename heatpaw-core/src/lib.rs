//! Core library for the `heatpaw` dog walk safety checker.
//!
//! This crate defines:
//! - Heat index risk classification and walk-time advice
//! - Paw safety checks (timed hold test, direct thermometer reading)
//! - The current-conditions acquisition chain with its provider and
//!   location abstractions
//! - The persisted, bounded walk log
//! - Configuration handling
//!
//! It is used by `heatpaw-cli`, but can also be reused by other front ends.

pub mod acquirer;
pub mod advisor;
pub mod config;
pub mod error;
pub mod history;
pub mod location;
pub mod model;
pub mod paw_check;
pub mod provider;
pub mod risk;
pub mod service;
pub mod settings;

pub use acquirer::{AcquisitionSettings, WeatherAcquirer};
pub use config::{Config, LocationConfig, ProviderConfig};
pub use error::{AcquisitionError, InputError, SourceError, StorageError};
pub use history::{LogRisk, WalkLogEntry, WalkLogStore};
pub use model::{Coordinates, LocationHint, PostalCode, RawWeather, SourceMethod, WeatherSnapshot};
pub use paw_check::{PawCheckEvaluator, PawMethod, PawVerdict};
pub use provider::WeatherProvider;
pub use risk::{HeatIndexResult, RiskThresholds, RiskTier};
pub use service::{HeatPaw, WalkDetails};
pub use settings::{FileSettings, MemorySettings, SettingsStore};
