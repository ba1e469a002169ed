//! Persisted tour progress.
//!
//! A snapshot that has not been written for 24 hours counts as abandoned
//! and is silently dropped the next time it is loaded.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rover_routing::Itinerary;
use serde::{Deserialize, Serialize};

/// Snapshots idle for longer than this are discarded on load.
pub const SNAPSHOT_TTL_HOURS: i64 = 24;

/// Serialized tour state plus the time it was last written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitSnapshot {
    pub itinerary: Itinerary,
    pub saved_at: DateTime<Utc>,
}

impl VisitSnapshot {
    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.saved_at > Duration::hours(SNAPSHOT_TTL_HOURS)
    }
}

/// Where tour snapshots live. Implementations only store and fetch;
/// staleness is decided in [`load_active`].
pub trait SnapshotStore {
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be read.
    fn load(&self) -> anyhow::Result<Option<VisitSnapshot>>;

    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be written.
    fn save(&self, snapshot: &VisitSnapshot) -> anyhow::Result<()>;

    /// # Errors
    ///
    /// Returns an error when an existing snapshot cannot be removed.
    fn clear(&self) -> anyhow::Result<()>;
}

/// Load the current snapshot, dropping it when it has expired.
///
/// # Errors
///
/// Returns an error when the store cannot be read or cleared.
pub fn load_active(
    store: &dyn SnapshotStore,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<VisitSnapshot>> {
    match store.load()? {
        Some(snapshot) if snapshot.is_stale(now) => {
            store.clear()?;
            Ok(None)
        }
        other => Ok(other),
    }
}

/// JSON file store, the default for the CLI.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SnapshotStore for FileStore {
    fn load(&self) -> anyhow::Result<Option<VisitSnapshot>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read '{}'", self.path.display()));
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "discarding unreadable tour snapshot"
                );
                self.clear()?;
                Ok(None)
            }
        }
    }

    fn save(&self, snapshot: &VisitSnapshot) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write '{}'", self.path.display()))
    }

    fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => {
                Err(error).with_context(|| format!("failed to remove '{}'", self.path.display()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use rover_routing::{optimize_route, Coordinate, Stop};

    use super::*;

    /// In-memory store for exercising the tour commands without files.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryStore {
        slot: RefCell<Option<VisitSnapshot>>,
    }

    impl MemoryStore {
        pub(crate) fn snapshot(&self) -> Option<VisitSnapshot> {
            self.slot.borrow().clone()
        }
    }

    impl SnapshotStore for MemoryStore {
        fn load(&self) -> anyhow::Result<Option<VisitSnapshot>> {
            Ok(self.slot.borrow().clone())
        }

        fn save(&self, snapshot: &VisitSnapshot) -> anyhow::Result<()> {
            *self.slot.borrow_mut() = Some(snapshot.clone());
            Ok(())
        }

        fn clear(&self) -> anyhow::Result<()> {
            *self.slot.borrow_mut() = None;
            Ok(())
        }
    }

    pub(crate) fn sample_snapshot(saved_at: DateTime<Utc>) -> VisitSnapshot {
        let stops = vec![
            Stop {
                id: "M1".to_owned(),
                name: "Billa Graz".to_owned(),
                coordinate: Some(Coordinate {
                    latitude: 47.07,
                    longitude: 15.44,
                }),
            },
            Stop {
                id: "M2".to_owned(),
                name: "Spar Wien".to_owned(),
                coordinate: Some(Coordinate {
                    latitude: 48.21,
                    longitude: 16.37,
                }),
            },
        ];
        let mut itinerary = Itinerary::new(optimize_route(&stops));
        itinerary.start(saved_at);
        VisitSnapshot {
            itinerary,
            saved_at,
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn fresh_snapshot_survives_load() {
        let store = MemoryStore::default();
        let saved_at = utc("2026-03-02T08:00:00Z");
        store.save(&sample_snapshot(saved_at)).unwrap();

        let loaded = load_active(&store, utc("2026-03-03T07:59:00Z")).unwrap();
        assert!(loaded.is_some());
    }

    #[test]
    fn stale_snapshot_is_discarded_and_cleared() {
        let store = MemoryStore::default();
        let saved_at = utc("2026-03-02T08:00:00Z");
        store.save(&sample_snapshot(saved_at)).unwrap();

        let loaded = load_active(&store, utc("2026-03-03T08:00:01Z")).unwrap();
        assert!(loaded.is_none());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn exactly_24_hours_is_still_fresh() {
        let store = MemoryStore::default();
        let saved_at = utc("2026-03-02T08:00:00Z");
        store.save(&sample_snapshot(saved_at)).unwrap();

        let loaded = load_active(&store, utc("2026-03-03T08:00:00Z")).unwrap();
        assert!(loaded.is_some());
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let path = std::env::temp_dir().join(format!("rover-tour-test-{}.json", std::process::id()));
        let store = FileStore::new(path.clone());
        store.clear().unwrap();

        assert!(store.load().unwrap().is_none());

        let saved_at = utc("2026-03-02T08:00:00Z");
        store.save(&sample_snapshot(saved_at)).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.saved_at, saved_at);
        assert_eq!(loaded.itinerary.route().optimized_order.len(), 2);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn unreadable_file_is_dropped_on_load() {
        let path =
            std::env::temp_dir().join(format!("rover-tour-corrupt-{}.json", std::process::id()));
        std::fs::write(&path, "not json").unwrap();
        let store = FileStore::new(path.clone());

        assert!(store.load().unwrap().is_none());
        assert!(!path.exists());
    }
}
