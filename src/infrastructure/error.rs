//! Infrastructure-level errors raised at the fetch boundary

use thiserror::Error;

/// Failures of the fetch collaborator. All of them are recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP request for {city} failed: {message}")]
    Http { city: String, message: String },

    #[error("request for {city} timed out")]
    Timeout { city: String },

    #[error("weather service returned {code} for {city}: {body}")]
    Status {
        city: String,
        code: u16,
        body: String,
    },

    #[error("city not found: {0}")]
    NotFound(String),

    #[error("cannot parse weather response for {city}: {message}")]
    Parse { city: String, message: String },

    #[error("fetcher misconfigured: {0}")]
    Config(String),
}

impl FetchError {
    /// Build an error from a reqwest failure, keeping timeouts distinct.
    pub fn from_reqwest(city: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout {
                city: city.to_string(),
            }
        } else {
            Self::Http {
                city: city.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;
