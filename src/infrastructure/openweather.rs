//! OpenWeatherMap current-weather client.
//!
//! Fetches `/weather?q=<city>&units=metric` and converts the response
//! to the shared `WeatherRecord` format.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::domain::WeatherRecord;
use crate::infrastructure::error::{FetchError, FetchResult};
use crate::infrastructure::traits::WeatherFetcher;

/// Blocking HTTP client for the OpenWeatherMap API.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

/// Response from `/weather`. Only the fields we keep.
#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    pub name: String,
    pub coord: Coord,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub main: MainReadings,
    pub wind: Wind,
    #[serde(default)]
    pub visibility: f64,
}

#[derive(Debug, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
}

#[derive(Debug, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

impl From<CurrentWeatherResponse> for WeatherRecord {
    fn from(r: CurrentWeatherResponse) -> Self {
        let description = r
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .unwrap_or_default();
        Self {
            city: r.name,
            longitude: r.coord.lon,
            latitude: r.coord.lat,
            description,
            temperature: r.main.temp,
            apparent_temperature: r.main.feels_like,
            min_temperature: r.main.temp_min,
            max_temperature: r.main.temp_max,
            pressure: r.main.pressure,
            humidity: r.main.humidity,
            wind_speed: r.wind.speed,
            visibility: r.visibility,
        }
    }
}

/// Decode a response body into a record.
pub fn parse_current_weather(city: &str, body: &str) -> FetchResult<WeatherRecord> {
    serde_json::from_str::<CurrentWeatherResponse>(body)
        .map(WeatherRecord::from)
        .map_err(|e| FetchError::Parse {
            city: city.to_string(),
            message: e.to_string(),
        })
}

impl OpenWeatherClient {
    pub fn new(api: &ApiConfig) -> FetchResult<Self> {
        let api_key = api
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| FetchError::Config("api_key is not set".into()))?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("wxcache/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| FetchError::Config(format!("build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/weather", self.base_url)
    }
}

impl WeatherFetcher for OpenWeatherClient {
    #[instrument(level = "debug", skip(self))]
    fn fetch(&self, city: &str) -> FetchResult<WeatherRecord> {
        debug!("Fetching current weather: {} city={}", self.endpoint(), city);

        let resp = self
            .client
            .get(self.endpoint())
            .query(&[("q", city), ("units", "metric"), ("appid", self.api_key.as_str())])
            .send()
            .map_err(|e| FetchError::from_reqwest(city, e))?;

        let status = resp.status().as_u16();
        if status == 404 {
            return Err(FetchError::NotFound(city.to_string()));
        }
        let body = resp.text().map_err(|e| FetchError::from_reqwest(city, e))?;
        if status != 200 {
            return Err(FetchError::Status {
                city: city.to_string(),
                code: status,
                body: body.chars().take(500).collect(),
            });
        }

        parse_current_weather(city, &body)
    }
}
