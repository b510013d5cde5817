//! Application-level errors (wraps tree and fetch errors)

use thiserror::Error;

use crate::domain::TreeError;
use crate::infrastructure::FetchError;

/// Cache errors wrap tree and fetch errors and add cache-level context.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("invalid city name: {0:?}")]
    InvalidName(String),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("city list error: {context}")]
    CityList {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CacheError {
    /// The fetch failure behind this error, if that is what it is.
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            CacheError::Fetch(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
