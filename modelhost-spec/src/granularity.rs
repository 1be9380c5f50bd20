use crate::time::{granularity_to_ms, TimeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket width of an aggregate, e.g. `"1m"`. Keeps the text the caller wrote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Granularity {
    text: String,
    ms: i64,
}

impl Granularity {
    pub fn parse(text: &str) -> Result<Self, TimeError> {
        let ms = granularity_to_ms(text)?;
        Ok(Self {
            text: text.to_string(),
            ms,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Bucket width in milliseconds (always positive).
    pub fn as_ms(&self) -> i64 {
        self.ms
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Granularity {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Granularity {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Granularity> for String {
    fn from(granularity: Granularity) -> Self {
        granularity.text
    }
}
