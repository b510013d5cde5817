//! Service container for dependency injection
//!
//! Wires the shared cache to its fetcher from loaded settings.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::application::{CacheResult, CityNameList, SharedCache};
use crate::config::Settings;
use crate::infrastructure::openweather::OpenWeatherClient;
use crate::infrastructure::traits::WeatherFetcher;

pub type DynFetcher = Arc<dyn WeatherFetcher>;

/// Container holding the cache and everything it depends on.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Fetch collaborator shared with the cache
    pub fetcher: DynFetcher,

    /// Thread-safe record cache, seeded with `bootstrap_city` if set
    pub cache: Arc<SharedCache<DynFetcher>>,

    /// Known city names, when `city_list` is configured
    pub city_names: Option<Arc<CityNameList>>,
}

impl ServiceContainer {
    /// Create a container backed by the OpenWeatherMap client.
    pub fn new(settings: Settings) -> CacheResult<Self> {
        let client = OpenWeatherClient::new(&settings.api)?;
        Self::with_deps(settings, Arc::new(client))
    }

    /// Create a container with a custom fetcher (for testing).
    pub fn with_deps(settings: Settings, fetcher: DynFetcher) -> CacheResult<Self> {
        let config = settings.cache_config();
        let cache = match settings.bootstrap_city.as_deref() {
            Some(city) => SharedCache::with_bootstrap(Arc::clone(&fetcher), config, city, Utc::now()),
            None => SharedCache::new(Arc::clone(&fetcher), config),
        };

        let city_names = match settings.city_list.as_deref() {
            Some(path) if path.exists() => Some(Arc::new(CityNameList::load(path)?)),
            Some(path) => {
                warn!("city list {} not found, search disabled", path.display());
                None
            }
            None => None,
        };

        info!("cache ready with {} entries", cache.len());
        Ok(Self {
            settings: Arc::new(settings),
            fetcher,
            cache: Arc::new(cache),
            city_names,
        })
    }
}
