//! Persisted log of past walk decisions.
//!
//! The log is insertion-ordered and holds at most [`WALK_LOG_CAPACITY`]
//! entries; appending past capacity evicts from the front. Every operation
//! reads and writes the backing settings under one lock, so an append and a
//! clear never interleave.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    model::WeatherSnapshot,
    paw_check::PawVerdict,
    risk::RiskTier,
    settings::SettingsStore,
};

pub const WALK_LOGS_KEY: &str = "walkLogs";
pub const WALK_LOG_CAPACITY: usize = 50;

/// Risk recorded with a walk: the heat tier adjusted by the paw verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRisk {
    Safe,
    Caution,
    Danger,
}

impl LogRisk {
    /// A hot surface always logs as danger. A cool surface caps the heat
    /// tier at caution.
    pub fn from_outcome(tier: RiskTier, surface_safe: bool) -> Self {
        if !surface_safe {
            return LogRisk::Danger;
        }
        match tier {
            RiskTier::Safe => LogRisk::Safe,
            RiskTier::Caution | RiskTier::Danger | RiskTier::Extreme => LogRisk::Caution,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogRisk::Safe => "safe",
            LogRisk::Caution => "caution",
            LogRisk::Danger => "danger",
        }
    }
}

impl fmt::Display for LogRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkLogEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "temperature")]
    pub air_temperature_f: f64,
    #[serde(rename = "heatIndex")]
    pub heat_index_f: i64,
    #[serde(rename = "surfaceTemp", default, skip_serializing_if = "Option::is_none")]
    pub surface_temp_f: Option<f64>,
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "riskLevel")]
    pub risk: LogRisk,
}

impl WalkLogEntry {
    pub fn new(date: DateTime<Utc>, air_temperature_f: f64, heat_index_f: i64, risk: LogRisk) -> Self {
        Self {
            id: time_id(date),
            date,
            air_temperature_f,
            heat_index_f,
            surface_temp_f: None,
            duration_minutes: None,
            notes: None,
            risk,
        }
    }

    /// Entry for a paw check taken under the given conditions.
    pub fn from_check(snapshot: &WeatherSnapshot, verdict: &PawVerdict, date: DateTime<Utc>) -> Self {
        let risk = LogRisk::from_outcome(snapshot.heat.risk_tier, verdict.is_safe);
        Self::new(date, snapshot.temperature_f, snapshot.heat.heat_index_f, risk)
            .with_surface_temp(verdict.surface_temp_f)
    }

    pub fn with_surface_temp(mut self, surface_temp_f: f64) -> Self {
        self.surface_temp_f = Some(surface_temp_f);
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() { None } else { Some(notes) };
        self
    }

    fn has_finite_readings(&self) -> bool {
        self.air_temperature_f.is_finite() && self.surface_temp_f.is_none_or(f64::is_finite)
    }
}

fn time_id(date: DateTime<Utc>) -> String {
    match date.timestamp_nanos_opt() {
        Some(nanos) => nanos.to_string(),
        None => date.timestamp_millis().to_string(),
    }
}

/// `base-1`, `base-2`, ... whichever is first free.
fn unused_id(entries: &[WalkLogEntry], base: &str) -> String {
    (1u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| entries.iter().all(|e| &e.id != candidate))
        .unwrap_or_else(|| base.to_string())
}

pub struct WalkLogStore {
    settings: Mutex<Box<dyn SettingsStore>>,
    capacity: usize,
}

impl WalkLogStore {
    pub fn new(settings: impl SettingsStore + 'static) -> Self {
        Self::with_capacity(settings, WALK_LOG_CAPACITY)
    }

    pub fn with_capacity(settings: impl SettingsStore + 'static, capacity: usize) -> Self {
        Self { settings: Mutex::new(Box::new(settings)), capacity }
    }

    /// Add an entry at the end, evicting the oldest past capacity, and
    /// return it as stored.
    ///
    /// An entry whose id is already taken gets a numeric suffix. Entries with
    /// a non-finite temperature have no JSON form and are dropped with a
    /// warning (`None`). Persistence failures are logged, never returned.
    pub fn append(&self, mut entry: WalkLogEntry) -> Option<WalkLogEntry> {
        if !entry.has_finite_readings() {
            warn!(
                id = %entry.id,
                temperature = entry.air_temperature_f,
                surface = ?entry.surface_temp_f,
                "refusing to log walk with a non-finite temperature"
            );
            return None;
        }

        let mut settings = self.lock();
        let mut entries = load(&**settings);

        if entries.iter().any(|e| e.id == entry.id) {
            entry.id = unused_id(&entries, &entry.id);
        }

        debug!(id = %entry.id, risk = %entry.risk, "appending walk log entry");
        entries.push(entry.clone());
        if entries.len() > self.capacity {
            let evicted = entries.len() - self.capacity;
            entries.drain(..evicted);
            debug!(evicted, "evicted oldest walk log entries");
        }

        match serde_json::to_string(&entries) {
            Ok(json) => {
                if let Err(err) = settings.set_string(WALK_LOGS_KEY, json) {
                    error!(error = %err, "failed to save walk log");
                }
            }
            Err(err) => error!(error = %err, "failed to serialize walk log"),
        }

        Some(entry)
    }

    /// Entries in insertion order.
    pub fn list(&self) -> Vec<WalkLogEntry> {
        load(&**self.lock())
    }

    /// Entries sorted by date, newest first.
    pub fn list_recent_first(&self) -> Vec<WalkLogEntry> {
        let mut entries = self.list();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut settings = self.lock();
        if let Err(err) = settings.remove(WALK_LOGS_KEY) {
            error!(error = %err, "failed to clear walk log");
            return;
        }
        info!("walk log cleared");
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn SettingsStore>> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stored entries; a missing or unreadable value is an empty log.
fn load(settings: &dyn SettingsStore) -> Vec<WalkLogEntry> {
    let Some(json) = settings.get_string(WALK_LOGS_KEY) else {
        return Vec::new();
    };

    serde_json::from_str(&json).unwrap_or_else(|err| {
        warn!(error = %err, "stored walk log is corrupt, treating as empty");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{FileSettings, MemorySettings};
    use chrono::{Duration, TimeZone};

    fn entry(n: i64) -> WalkLogEntry {
        let date = Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap() + Duration::minutes(n);
        WalkLogEntry::new(date, 80.0 + n as f64, 82 + n, LogRisk::Caution)
    }

    #[test]
    fn keeps_the_last_fifty_in_order() {
        let store = WalkLogStore::new(MemorySettings::default());
        for n in 0..55 {
            store.append(entry(n));
        }

        let entries = store.list();
        assert_eq!(entries.len(), 50);
        let expected: Vec<WalkLogEntry> = (5..55).map(entry).collect();
        assert_eq!(entries, expected);
    }

    #[test]
    fn clear_empties_the_log() {
        let store = WalkLogStore::new(MemorySettings::default());
        store.append(entry(1));
        store.append(entry(2));
        store.clear();

        assert!(store.list().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn recent_first_is_a_read_time_view() {
        let store = WalkLogStore::new(MemorySettings::default());
        store.append(entry(5));
        store.append(entry(1));
        store.append(entry(9));

        let ids: Vec<i64> = store.list_recent_first().iter().map(|e| e.heat_index_f - 82).collect();
        assert_eq!(ids, vec![9, 5, 1]);
        let stored: Vec<i64> = store.list().iter().map(|e| e.heat_index_f - 82).collect();
        assert_eq!(stored, vec![5, 1, 9]);
    }

    #[test]
    fn entries_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let full = entry(3).with_surface_temp(118.5).with_duration(25).with_notes("shady route");
        let bare = entry(4);
        {
            let store = WalkLogStore::new(FileSettings::open(&path).unwrap());
            store.append(full.clone());
            store.append(bare.clone());
        }

        let store = WalkLogStore::new(FileSettings::open(&path).unwrap());
        assert_eq!(store.list(), vec![full, bare]);
    }

    #[test]
    fn serialized_shape_matches_stored_format() {
        let e = entry(0).with_surface_temp(130.0);
        let json = serde_json::to_value(&e).unwrap();

        assert_eq!(json["temperature"], 80.0);
        assert_eq!(json["heatIndex"], 82);
        assert_eq!(json["surfaceTemp"], 130.0);
        assert_eq!(json["riskLevel"], "caution");
        assert_eq!(json["date"], "2025-07-01T08:00:00Z");
        assert!(json.get("duration").is_none());
        assert!(json.get("notes").is_none());
    }

    #[test]
    fn reads_entries_written_with_millisecond_timestamps() {
        let mut settings = MemorySettings::default();
        settings
            .set_string(
                WALK_LOGS_KEY,
                r#"[{"id":"1719820800000","date":"2024-07-01T08:00:00.000Z","temperature":91,
                    "heatIndex":97,"surfaceTemp":120,"riskLevel":"caution"}]"#
                    .to_string(),
            )
            .unwrap();

        let store = WalkLogStore::new(settings);
        let entries = store.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap());
        assert_eq!(entries[0].surface_temp_f, Some(120.0));
        assert_eq!(entries[0].duration_minutes, None);
    }

    #[test]
    fn corrupt_log_reads_as_empty_and_is_replaced_on_append() {
        let mut settings = MemorySettings::default();
        settings.set_string(WALK_LOGS_KEY, "[{\"id\":".to_string()).unwrap();

        let store = WalkLogStore::new(settings);
        assert!(store.list().is_empty());

        store.append(entry(1));
        assert_eq!(store.list(), vec![entry(1)]);
    }

    #[test]
    fn non_finite_entry_is_dropped_and_history_kept() {
        let store = WalkLogStore::new(MemorySettings::default());
        store.append(entry(1));
        store.append(entry(2));

        let mut bad = entry(3);
        bad.air_temperature_f = f64::NAN;
        assert_eq!(store.append(bad), None);
        assert_eq!(store.append(entry(4).with_surface_temp(f64::INFINITY)), None);

        store.append(entry(5));
        assert_eq!(store.list(), vec![entry(1), entry(2), entry(5)]);
    }

    #[test]
    fn same_timestamp_entries_get_distinct_ids() {
        let store = WalkLogStore::new(MemorySettings::default());
        let first = store.append(entry(0)).unwrap();
        let second = store.append(entry(0)).unwrap();
        let third = store.append(entry(0)).unwrap();

        assert_eq!(second.id, format!("{}-1", first.id));
        assert_eq!(third.id, format!("{}-2", first.id));

        let ids: Vec<String> = store.list().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
    }

    #[test]
    fn log_risk_follows_the_verdict() {
        assert_eq!(LogRisk::from_outcome(RiskTier::Safe, false), LogRisk::Danger);
        assert_eq!(LogRisk::from_outcome(RiskTier::Safe, true), LogRisk::Safe);
        assert_eq!(LogRisk::from_outcome(RiskTier::Caution, true), LogRisk::Caution);
        assert_eq!(LogRisk::from_outcome(RiskTier::Danger, true), LogRisk::Caution);
        assert_eq!(LogRisk::from_outcome(RiskTier::Extreme, true), LogRisk::Caution);
    }

    #[test]
    fn blank_notes_are_dropped() {
        assert_eq!(entry(0).with_notes("  ").notes, None);
    }

    #[test]
    fn concurrent_appends_and_clears_stay_bounded() {
        use std::sync::Arc;

        let store = Arc::new(WalkLogStore::with_capacity(MemorySettings::default(), 10));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for n in 0..25 {
                        store.append(entry(t * 100 + n));
                        if n % 10 == 9 && t == 0 {
                            store.clear();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert!(store.len() <= 10);
    }
}
