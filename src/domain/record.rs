//! Weather records and cache entries

use chrono::{DateTime, TimeDelta, Utc};

/// Current conditions for one city, as returned by the fetch collaborator.
///
/// Metric units: °C, hPa, %, m/s, visibility in metres.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub city: String,
    pub longitude: f64,
    pub latitude: f64,
    pub description: String,
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub visibility: f64,
}

/// Record plus refresh bookkeeping, stored as the tree payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    record: WeatherRecord,
    last_refreshed: DateTime<Utc>,
    /// Set when a staleness refresh failed; cleared by the next success
    refresh_failed_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn new(record: WeatherRecord, now: DateTime<Utc>) -> Self {
        Self {
            record,
            last_refreshed: now,
            refresh_failed_at: None,
        }
    }

    pub fn record(&self) -> &WeatherRecord {
        &self.record
    }

    pub fn last_refreshed(&self) -> DateTime<Utc> {
        self.last_refreshed
    }

    pub fn refresh_failed_at(&self) -> Option<DateTime<Utc>> {
        self.refresh_failed_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.last_refreshed
    }

    /// Replaces the payload after a successful fetch.
    pub(crate) fn refresh(&mut self, record: WeatherRecord, now: DateTime<Utc>) {
        self.record = record;
        self.last_refreshed = now;
        self.refresh_failed_at = None;
    }

    pub(crate) fn mark_refresh_failed(&mut self, now: DateTime<Utc>) {
        self.refresh_failed_at = Some(now);
    }
}
