//! Resume position persistence
//!
//! Offsets are stored in a small JSON file keyed by title (and episode), written atomically
//! through a temporary file. Reads ignore entries past their maximum age and offsets that are
//! within the finished window of the known duration.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{Error, Result, config::ResumeSettings};

/// One persisted position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeEntry {
    pub offset: f64,
    pub duration: Option<f64>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ResumeStore {
    path: Option<PathBuf>,
    min_progress_secs: f64,
    finished_window_secs: f64,
    max_age: Duration,
    persist_interval: std::time::Duration,
    entries: Mutex<HashMap<String, ResumeEntry>>,
}

impl ResumeStore {
    /// Open a file-backed store; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>, settings: &ResumeSettings) -> Result<Self> {
        let path = path.into();
        let entries: HashMap<String, ResumeEntry> = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable resume store {:?}: {}", path, e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self::with_entries(Some(path), settings, entries))
    }

    /// Store that never touches disk
    pub fn in_memory(settings: &ResumeSettings) -> Self {
        Self::with_entries(None, settings, HashMap::new())
    }

    fn with_entries(
        path: Option<PathBuf>,
        settings: &ResumeSettings,
        entries: HashMap<String, ResumeEntry>,
    ) -> Self {
        Self {
            path,
            min_progress_secs: settings.min_progress_secs,
            finished_window_secs: settings.finished_window_secs,
            max_age: Duration::days(settings.max_age_days),
            persist_interval: std::time::Duration::from_secs(settings.persist_interval_secs),
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// How often a playing session's position is written
    pub fn persist_interval(&self) -> std::time::Duration {
        self.persist_interval
    }

    /// Persist an offset; positions at or below the minimum progress are skipped
    pub fn save(&self, key: &str, offset: f64, duration: Option<f64>) -> Result<bool> {
        self.save_at(key, offset, duration, Utc::now())
    }

    pub fn save_at(
        &self,
        key: &str,
        offset: f64,
        duration: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if !offset.is_finite() || offset <= self.min_progress_secs {
            return Ok(false);
        }

        let snapshot = {
            let mut entries = self.lock()?;
            entries.retain(|_, entry| now - entry.saved_at <= self.max_age);
            entries.insert(
                key.to_string(),
                ResumeEntry {
                    offset,
                    duration: duration.filter(|d| d.is_finite() && *d > 0.0),
                    saved_at: now,
                },
            );
            entries.clone()
        };

        self.flush(&snapshot)?;
        tracing::debug!("Saved resume offset {:.1}s for {}", offset, key);
        Ok(true)
    }

    /// Offset to start from, `0.0` when nothing usable is stored
    pub fn restore(&self, key: &str) -> f64 {
        self.restore_at(key, Utc::now())
    }

    pub fn restore_at(&self, key: &str, now: DateTime<Utc>) -> f64 {
        let Some(entry) = self.entry(key) else {
            return 0.0;
        };
        if now - entry.saved_at > self.max_age {
            return 0.0;
        }
        match entry.duration {
            Some(duration) if duration - entry.offset <= self.finished_window_secs => 0.0,
            _ => entry.offset,
        }
    }

    pub fn entry(&self, key: &str) -> Option<ResumeEntry> {
        self.lock().ok()?.get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let snapshot = {
            let mut entries = self.lock()?;
            entries.remove(key);
            entries.clone()
        };
        self.flush(&snapshot)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ResumeEntry>>> {
        self.entries
            .lock()
            .map_err(|_| Error::internal("resume store lock poisoned"))
    }

    fn flush(&self, entries: &HashMap<String, ResumeEntry>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings() -> ResumeSettings {
        ResumeSettings::default()
    }

    #[test]
    fn test_offset_near_end_restarts() {
        let store = ResumeStore::in_memory(&settings());
        store.save("k", 1395.0, Some(1400.0)).unwrap();
        assert_eq!(store.restore("k"), 0.0);

        store.save("k", 1390.0, Some(1400.0)).unwrap();
        assert_eq!(store.restore("k"), 0.0);
    }

    #[test]
    fn test_offset_fifteen_seconds_before_end_is_restored() {
        let store = ResumeStore::in_memory(&settings());
        store.save("k", 1385.0, Some(1400.0)).unwrap();
        assert_eq!(store.restore("k"), 1385.0);
    }

    #[test]
    fn test_unknown_duration_is_restored() {
        let store = ResumeStore::in_memory(&settings());
        store.save("k", 42.5, None).unwrap();
        assert_eq!(store.restore("k"), 42.5);
    }

    #[test]
    fn test_small_progress_not_saved() {
        let store = ResumeStore::in_memory(&settings());
        assert!(!store.save("k", 5.0, Some(1400.0)).unwrap());
        assert!(!store.save("k", f64::NAN, None).unwrap());
        assert!(store.entry("k").is_none());
        assert_eq!(store.restore("k"), 0.0);
    }

    #[test]
    fn test_expired_entries_ignored() {
        let store = ResumeStore::in_memory(&settings());
        let saved = Utc::now() - Duration::days(8);
        store.save_at("k", 300.0, Some(1400.0), saved).unwrap();

        assert_eq!(store.restore("k"), 0.0);
        assert_eq!(store.restore_at("k", saved + Duration::days(6)), 300.0);
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("resume.json");

        let store = ResumeStore::open(&path, &settings()).unwrap();
        store.save("title:frieren:s1e3", 612.0, Some(1420.0)).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = ResumeStore::open(&path, &settings()).unwrap();
        assert_eq!(reopened.restore("title:frieren:s1e3"), 612.0);

        reopened.remove("title:frieren:s1e3").unwrap();
        let again = ResumeStore::open(&path, &settings()).unwrap();
        assert_eq!(again.restore("title:frieren:s1e3"), 0.0);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resume.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = ResumeStore::open(&path, &settings()).unwrap();
        assert_eq!(store.restore("anything"), 0.0);
    }

    #[test]
    fn test_saving_prunes_expired_entries() {
        let store = ResumeStore::in_memory(&settings());
        let now = Utc::now();
        store.save_at("old", 100.0, None, now - Duration::days(10)).unwrap();
        store.save_at("new", 100.0, None, now).unwrap();
        assert!(store.entry("old").is_none());
        assert!(store.entry("new").is_some());
    }
}
