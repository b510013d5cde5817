//! Scripted fetcher shared by the integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use wxcache::util::testing::init_test_setup;
use wxcache::{FetchError, FetchResult, WeatherFetcher, WeatherRecord};

/// Returns a record whose temperature is the 1-based call number, so tests
/// can tell which fetch produced what they got back.
#[derive(Default)]
pub struct ScriptedFetcher {
    calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        init_test_setup();
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        init_test_setup();
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make fetches for `city` (case-insensitive) fail until `recover`.
    pub fn fail(&self, city: &str) {
        self.failing.lock().unwrap().insert(city.to_lowercase());
    }

    pub fn recover(&self, city: &str) {
        self.failing.lock().unwrap().remove(&city.to_lowercase());
    }
}

impl WeatherFetcher for ScriptedFetcher {
    fn fetch(&self, city: &str) -> FetchResult<WeatherRecord> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.failing.lock().unwrap().contains(&city.to_lowercase()) {
            return Err(FetchError::Timeout {
                city: city.to_string(),
            });
        }
        Ok(record(city, n as f64))
    }
}

pub fn record(city: &str, temperature: f64) -> WeatherRecord {
    WeatherRecord {
        city: city.to_string(),
        longitude: -89.4,
        latitude: 43.07,
        description: "clear sky".into(),
        temperature,
        apparent_temperature: temperature,
        min_temperature: temperature - 2.0,
        max_temperature: temperature + 2.0,
        pressure: 1013.0,
        humidity: 50.0,
        wind_speed: 3.0,
        visibility: 10000.0,
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}
