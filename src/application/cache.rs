//! Record cache on top of the red-black tree.
//!
//! Entries are keyed by the normalized query name. A miss fetches and
//! inserts; a stale hit fetches and replaces the payload of the existing
//! node in place, so the tree shape never changes on refresh.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, instrument, warn};

use crate::application::{CacheError, CacheResult};
use crate::domain::{CacheEntry, CityKey, KeyNormalization, RbTree, TreeError, WeatherRecord};
use crate::infrastructure::{FetchResult, WeatherFetcher};

/// Cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age at which an entry must be refreshed before it is served.
    pub staleness: TimeDelta,
    /// Rule turning a city name into a tree key.
    pub normalization: KeyNormalization,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            staleness: TimeDelta::hours(1),
            normalization: KeyNormalization::Lowercase,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_staleness(mut self, staleness: TimeDelta) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn with_normalization(mut self, normalization: KeyNormalization) -> Self {
        self.normalization = normalization;
        self
    }
}

/// What a lookup found, decided without fetching.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Probe {
    Miss,
    Hit(WeatherRecord),
    /// Stale entry; carries the city name to fetch
    Refresh(String),
}

/// Tree plus staleness policy. Holds no fetcher, so it can sit behind a lock
/// while fetches run outside of it.
#[derive(Debug, Default)]
pub struct CacheStore {
    tree: RbTree<CityKey, CacheEntry>,
    config: CacheConfig,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            tree: RbTree::new(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Normalized key for `name`; blank names are rejected.
    pub fn key(&self, name: &str) -> CacheResult<CityKey> {
        let key = self.config.normalization.normalize(name);
        if key.is_empty() {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(key)
    }

    /// Closed boundary: exactly `staleness` old counts as stale.
    pub fn is_stale(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        entry.age(now) >= self.config.staleness
    }

    /// Stale, and not inside the back-off window of a failed refresh.
    fn needs_refresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        self.is_stale(entry, now)
            && !entry
                .refresh_failed_at()
                .is_some_and(|failed| now - failed < self.config.staleness)
    }

    pub fn lookup(&self, name: &str) -> Option<&CacheEntry> {
        let key = self.config.normalization.normalize(name);
        self.tree.lookup(&key)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Cached keys in ascending order.
    pub fn cities(&self) -> impl Iterator<Item = &CityKey> {
        self.tree.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CityKey, &CacheEntry)> {
        self.tree.in_order()
    }

    pub fn tree(&self) -> &RbTree<CityKey, CacheEntry> {
        &self.tree
    }

    pub(crate) fn probe(&self, key: &CityKey, now: DateTime<Utc>) -> Probe {
        match self.tree.lookup(key) {
            None => Probe::Miss,
            Some(entry) if self.needs_refresh(entry, now) => {
                Probe::Refresh(entry.record().city.clone())
            }
            Some(entry) => Probe::Hit(entry.record().clone()),
        }
    }

    pub(crate) fn insert_fetched(
        &mut self,
        key: CityKey,
        record: WeatherRecord,
        now: DateTime<Utc>,
    ) -> CacheResult<()> {
        info!("caching {} as {}", record.city, key);
        self.tree.insert(key, CacheEntry::new(record, now))?;
        Ok(())
    }

    /// Applies the outcome of a staleness refresh to the existing node.
    ///
    /// On failure the old record and its timestamp stay, the failure time is
    /// stamped, and the error is returned.
    pub(crate) fn apply_refresh(
        &mut self,
        key: &CityKey,
        fetched: FetchResult<WeatherRecord>,
        now: DateTime<Utc>,
    ) -> CacheResult<WeatherRecord> {
        let Some(entry) = self.tree.lookup_mut(key) else {
            // refresh is only probed for present keys and entries are never removed
            return Err(TreeError::InvariantViolation(format!(
                "refreshed key {key} is not in the tree"
            ))
            .into());
        };
        match fetched {
            Ok(record) => {
                debug!("refreshed {}", key);
                entry.refresh(record.clone(), now);
                Ok(record)
            }
            Err(e) => {
                warn!("refresh of {} failed, keeping stale record: {}", key, e);
                entry.mark_refresh_failed(now);
                Err(e.into())
            }
        }
    }
}

/// Single-owner cache: the tree, the policy and the fetch collaborator.
pub struct RecordCache<F> {
    store: CacheStore,
    fetcher: F,
}

impl<F: WeatherFetcher> RecordCache<F> {
    pub fn new(fetcher: F, config: CacheConfig) -> Self {
        Self {
            store: CacheStore::new(config),
            fetcher,
        }
    }

    /// New cache seeded with `city`. A failed seed fetch leaves it empty.
    pub fn with_bootstrap(fetcher: F, config: CacheConfig, city: &str, now: DateTime<Utc>) -> Self {
        let mut cache = Self::new(fetcher, config);
        if let Err(e) = cache.get(city, now) {
            warn!("bootstrap fetch for {} failed: {}", city, e);
        }
        cache
    }

    /// Record for `name`, fetching on a miss or when the entry is stale.
    #[instrument(level = "debug", skip(self))]
    pub fn get(&mut self, name: &str, now: DateTime<Utc>) -> CacheResult<WeatherRecord> {
        let key = self.store.key(name)?;
        match self.store.probe(&key, now) {
            Probe::Hit(record) => Ok(record),
            Probe::Miss => {
                debug!("miss: {}", key);
                let record = self.fetcher.fetch(name.trim())?;
                self.store.insert_fetched(key, record.clone(), now)?;
                Ok(record)
            }
            Probe::Refresh(city) => {
                debug!("stale: {}", key);
                let fetched = self.fetcher.fetch(&city);
                self.store.apply_refresh(&key, fetched, now)
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&CacheEntry> {
        self.store.lookup(name)
    }

    pub fn is_stale(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        self.store.is_stale(entry, now)
    }

    pub fn cities(&self) -> impl Iterator<Item = &CityKey> {
        self.store.cities()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CityKey, &CacheEntry)> {
        self.store.entries()
    }

    pub fn tree(&self) -> &RbTree<CityKey, CacheEntry> {
        self.store.tree()
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::FetchError;
    use chrono::TimeZone;

    struct Echo;

    impl WeatherFetcher for Echo {
        fn fetch(&self, city: &str) -> FetchResult<WeatherRecord> {
            if city == "Nowhere" {
                return Err(FetchError::NotFound(city.into()));
            }
            Ok(WeatherRecord {
                city: city.to_string(),
                longitude: 0.0,
                latitude: 0.0,
                description: "clear sky".into(),
                temperature: 20.0,
                apparent_temperature: 20.0,
                min_temperature: 18.0,
                max_temperature: 22.0,
                pressure: 1013.0,
                humidity: 40.0,
                wind_speed: 1.0,
                visibility: 10000.0,
            })
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn given_entry_exactly_threshold_old_when_checked_then_stale() {
        let store = CacheStore::new(CacheConfig::default());
        let entry = CacheEntry::new(Echo.fetch("Madison").unwrap(), t0());

        assert!(!store.is_stale(&entry, t0() + TimeDelta::minutes(59)));
        assert!(store.is_stale(&entry, t0() + TimeDelta::hours(1)));
    }

    #[test]
    fn given_absent_key_when_applying_refresh_then_invariant_violation() {
        let mut store = CacheStore::new(CacheConfig::default());
        let key = store.key("Madison").unwrap();

        let err = store
            .apply_refresh(&key, Echo.fetch("Madison"), t0())
            .unwrap_err();

        assert!(matches!(
            err,
            CacheError::Tree(TreeError::InvariantViolation(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn given_blank_name_when_get_then_invalid_name() {
        let mut cache = RecordCache::new(Echo, CacheConfig::default());
        let err = cache.get("   ", t0()).unwrap_err();
        assert!(matches!(err, CacheError::InvalidName(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn given_failing_bootstrap_when_created_then_cache_is_empty() {
        let cache = RecordCache::with_bootstrap(Echo, CacheConfig::default(), "Nowhere", t0());
        assert!(cache.is_empty());
    }

    #[test]
    fn given_bootstrap_city_when_created_then_one_entry() {
        let cache = RecordCache::with_bootstrap(Echo, CacheConfig::default(), "Madison", t0());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("MADISON").map(|e| e.last_refreshed()), Some(t0()));
    }
}
