use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::InputError, risk::HeatIndexResult};

/// Raw current conditions as returned by a weather source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWeather {
    pub temperature_f: f64,
    pub humidity_pct: f64,
    pub condition: String,
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A US ZIP code: exactly five ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PostalCode {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() == 5 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(PostalCode(trimmed.to_string()))
        } else {
            Err(InputError::InvalidPostalCode(s.to_string()))
        }
    }
}

impl TryFrom<String> for PostalCode {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceMethod {
    Geo,
    PostalCode,
    Synthetic,
}

impl SourceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMethod::Geo => "geo",
            SourceMethod::PostalCode => "postal-code",
            SourceMethod::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller knows about where they are.
#[derive(Debug, Clone, Default)]
pub struct LocationHint {
    pub postal_code: Option<PostalCode>,
    /// Skip every live source and use the synthetic fallback.
    pub force_synthetic: bool,
}

impl LocationHint {
    pub fn postal(code: PostalCode) -> Self {
        Self { postal_code: Some(code), force_synthetic: false }
    }

    pub fn synthetic() -> Self {
        Self { postal_code: None, force_synthetic: true }
    }
}

/// Fully derived current conditions. Only the acquirer builds these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_f: f64,
    pub humidity_pct: f64,
    pub condition: String,
    pub location: String,
    pub captured_at: DateTime<Utc>,
    pub source: SourceMethod,
    pub heat: HeatIndexResult,
    pub walk_windows: Vec<String>,
}

impl WeatherSnapshot {
    pub fn is_synthetic(&self) -> bool {
        self.source == SourceMethod::Synthetic
    }
}
