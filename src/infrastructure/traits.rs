//! I/O boundary traits for testability
//!
//! The cache only sees this trait, so tests drive it with scripted fetchers.

use std::sync::Arc;

use crate::domain::WeatherRecord;
use crate::infrastructure::error::FetchResult;

/// Retrieves the current record for a city from an external source.
pub trait WeatherFetcher: Send + Sync {
    /// Fetch the record for `city` as typed by the caller (not normalized).
    fn fetch(&self, city: &str) -> FetchResult<WeatherRecord>;
}

impl<F: WeatherFetcher + ?Sized> WeatherFetcher for Arc<F> {
    fn fetch(&self, city: &str) -> FetchResult<WeatherRecord> {
        (**self).fetch(city)
    }
}
