//! Thread-safe cache for concurrent callers.
//!
//! The tree sits behind an `RwLock` that is never held across a fetch.
//! Fetches for the same key are serialized through a per-key guard in a
//! `DashMap`, so concurrent misses on one city cost a single fetch while
//! different cities fetch in parallel.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, instrument, warn};

use crate::application::cache::{CacheConfig, CacheStore, Probe};
use crate::application::CacheResult;
use crate::domain::{CacheEntry, CityKey, WeatherRecord};
use crate::infrastructure::WeatherFetcher;

type KeyGuard = Arc<Mutex<()>>;

/// Drops the key's guard from the map once nobody holds or waits on it.
struct InFlight<'a> {
    map: &'a DashMap<CityKey, KeyGuard>,
    key: &'a CityKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        // only the map still holds it: nobody is waiting on this key
        self.map
            .remove_if(self.key, |_, g| Arc::strong_count(g) == 1);
    }
}

pub struct SharedCache<F> {
    store: RwLock<CacheStore>,
    fetcher: F,
    in_flight: DashMap<CityKey, KeyGuard>,
}

impl<F: WeatherFetcher> SharedCache<F> {
    pub fn new(fetcher: F, config: CacheConfig) -> Self {
        Self {
            store: RwLock::new(CacheStore::new(config)),
            fetcher,
            in_flight: DashMap::new(),
        }
    }

    /// New cache seeded with `city`. A failed seed fetch leaves it empty.
    pub fn with_bootstrap(fetcher: F, config: CacheConfig, city: &str, now: DateTime<Utc>) -> Self {
        let cache = Self::new(fetcher, config);
        if let Err(e) = cache.get(city, now) {
            warn!("bootstrap fetch for {} failed: {}", city, e);
        }
        cache
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn key_guard(&self, key: &CityKey) -> KeyGuard {
        self.in_flight.entry(key.clone()).or_default().value().clone()
    }

    /// Record for `name`, fetching on a miss or when the entry is stale.
    #[instrument(level = "debug", skip(self))]
    pub fn get(&self, name: &str, now: DateTime<Utc>) -> CacheResult<WeatherRecord> {
        let key = {
            let store = self.read();
            let key = store.key(name)?;
            if let Probe::Hit(record) = store.probe(&key, now) {
                return Ok(record);
            }
            key
        };

        // declared first so it drops last, after the guard below, also on unwind
        let _cleanup = InFlight {
            map: &self.in_flight,
            key: &key,
        };
        let guard = self.key_guard(&key);
        let _held = guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.fetch_locked(name, &key, now)
    }

    /// Runs with the key guard held. Another caller may have filled or
    /// refreshed the entry while we waited, so probe again first.
    fn fetch_locked(
        &self,
        name: &str,
        key: &CityKey,
        now: DateTime<Utc>,
    ) -> CacheResult<WeatherRecord> {
        let probe = self.read().probe(key, now);
        match probe {
            Probe::Hit(record) => Ok(record),
            Probe::Miss => {
                debug!("miss: {}", key);
                let record = self.fetcher.fetch(name.trim())?;
                self.write().insert_fetched(key.clone(), record.clone(), now)?;
                Ok(record)
            }
            Probe::Refresh(city) => {
                debug!("stale: {}", key);
                let fetched = self.fetcher.fetch(&city);
                self.write().apply_refresh(key, fetched, now)
            }
        }
    }

    /// [`get`](Self::get) at the current wall-clock time.
    pub fn get_now(&self, name: &str) -> CacheResult<WeatherRecord> {
        self.get(name, Utc::now())
    }

    /// Copy of the cached entry, without fetching.
    pub fn lookup(&self, name: &str) -> Option<CacheEntry> {
        self.read().lookup(name).cloned()
    }

    pub fn config(&self) -> CacheConfig {
        *self.read().config()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Cached keys in ascending order.
    pub fn cities(&self) -> Vec<CityKey> {
        self.read().cities().cloned().collect()
    }

    /// Checks the red-black properties of the underlying tree.
    pub fn check_invariants(&self) -> CacheResult<usize> {
        Ok(self.read().tree().check_invariants()?)
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Keys with a fetch in progress or callers waiting on one.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
