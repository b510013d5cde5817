//! City keys and the normalization rule that produces them

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a city name is folded into a tree key.
///
/// Both rules trim surrounding whitespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyNormalization {
    /// Full Unicode lower-casing ("Zürich" and "ZÜRICH" collide)
    #[default]
    Lowercase,
    /// ASCII-only lower-casing, other characters kept verbatim
    AsciiLowercase,
}

impl KeyNormalization {
    pub fn normalize(self, name: &str) -> CityKey {
        let trimmed = name.trim();
        let folded = match self {
            KeyNormalization::Lowercase => trimmed.to_lowercase(),
            KeyNormalization::AsciiLowercase => trimmed.to_ascii_lowercase(),
        };
        CityKey(folded)
    }
}

impl FromStr for KeyNormalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowercase" => Ok(Self::Lowercase),
            "ascii-lowercase" | "ascii_lowercase" => Ok(Self::AsciiLowercase),
            other => Err(format!("unknown key normalization: {other}")),
        }
    }
}

/// Normalized city name used as the tree key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CityKey(String);

impl CityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<str> for CityKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
