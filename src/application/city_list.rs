//! Searchable list of known city names.
//!
//! Loaded from a JSON array of `{"name": ..., "country": ...}` objects
//! (the OpenWeatherMap `city.list.json` shape; extra fields are ignored).

use std::fmt;
use std::path::Path;

use itertools::Itertools;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::{CacheError, CacheResult};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CityName {
    pub name: String,
    pub country: String,
}

impl fmt::Display for CityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}", self.name, self.country)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CityNameList {
    cities: Vec<CityName>,
}

impl CityNameList {
    pub fn new(cities: Vec<CityName>) -> Self {
        Self { cities }
    }

    pub fn from_json_str(json: &str) -> CacheResult<Self> {
        let cities: Vec<CityName> =
            serde_json::from_str(json).map_err(|e| CacheError::CityList {
                context: "parse city list".into(),
                source: Box::new(e),
            })?;
        Ok(Self::new(cities))
    }

    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> CacheResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::CityList {
            context: format!("read {}", path.display()),
            source: Box::new(e),
        })?;
        let list = Self::from_json_str(&content)?;
        debug!("loaded {} cities", list.len());
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Exact, case-sensitive name match.
    pub fn contains(&self, name: &str) -> bool {
        self.cities.iter().any(|c| c.name == name)
    }

    /// Cities whose name starts with `prefix`, ignoring case.
    ///
    /// One result per distinct name (first listed wins), sorted by name.
    pub fn search_prefix(&self, prefix: &str) -> Vec<&CityName> {
        let prefix = prefix.trim().to_lowercase();
        self.cities
            .iter()
            .filter(|c| c.name.to_lowercase().starts_with(&prefix))
            .unique_by(|c| c.name.as_str())
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect()
    }

    /// Like [`search_prefix`](Self::search_prefix), restricted to one country code.
    pub fn search(&self, prefix: &str, country: &str) -> Vec<&CityName> {
        let prefix = prefix.trim().to_lowercase();
        let country = country.trim().to_uppercase();
        self.cities
            .iter()
            .filter(|c| c.country == country)
            .filter(|c| c.name.to_lowercase().starts_with(&prefix))
            .unique_by(|c| c.name.as_str())
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect()
    }
}
