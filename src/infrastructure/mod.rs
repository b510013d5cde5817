//! Infrastructure layer: the fetch boundary, its HTTP implementation and wiring

pub mod di;
pub mod error;
pub mod openweather;
pub mod traits;

pub use di::ServiceContainer;
pub use error::{FetchError, FetchResult};
pub use openweather::OpenWeatherClient;
pub use traits::WeatherFetcher;
