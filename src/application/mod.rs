//! Application layer: the record cache and its use cases
//!
//! This layer applies the staleness policy on top of the domain tree and
//! depends on the fetch boundary trait, never on a concrete client.

pub mod cache;
pub mod city_list;
pub mod error;
pub mod shared;

pub use cache::{CacheConfig, CacheStore, RecordCache};
pub use city_list::{CityName, CityNameList};
pub use error::{CacheError, CacheResult};
pub use shared::SharedCache;
