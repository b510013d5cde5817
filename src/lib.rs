//! wxcache: in-memory weather record cache on an arena-backed red-black tree.
//!
//! Records are keyed by normalized city name. A lookup that misses, or finds
//! an entry at least one staleness period old, asks a [`WeatherFetcher`] for
//! fresh data; stale refreshes replace the payload of the existing node in
//! place.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use application::{
    CacheConfig, CacheError, CacheResult, CacheStore, CityName, CityNameList, RecordCache,
    SharedCache,
};
pub use config::Settings;
pub use domain::{
    CacheEntry, CityKey, Color, KeyNormalization, RbTree, TreeError, TreeResult, WeatherRecord,
};
pub use infrastructure::{FetchError, FetchResult, OpenWeatherClient, WeatherFetcher};
