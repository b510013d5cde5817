//! Domain layer: the ordered tree and the records it stores
//!
//! This layer is independent of external concerns (no I/O, no HTTP, no config loading).

pub mod error;
pub mod format;
pub mod key;
pub mod record;
pub mod tree;

pub use error::{TreeError, TreeResult};
pub use format::{detail_report, summary_report};
pub use key::{CityKey, KeyNormalization};
pub use record::{CacheEntry, WeatherRecord};
pub use tree::{Color, InOrder, RbNode, RbTree};
