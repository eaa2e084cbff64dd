//! Blueprint identity: prefixed wrappers around store-assigned row ids

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// External identifier for a blueprint, rendered as `blueprint/<n>`
///
/// The numeric part is the store's row id. Callers should treat the whole
/// string as opaque; the wrapper exists so the storage key never leaks into
/// the external representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlueprintId(i64);

impl BlueprintId {
    /// Entity prefix used in the external form
    pub const PREFIX: &'static str = "blueprint";

    /// Wrap a store row id
    pub fn from_row_id(id: i64) -> Self {
        Self(id)
    }

    /// The store row id
    pub fn row_id(&self) -> i64 {
        self.0
    }

    /// Parse a BlueprintId from its external form
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for BlueprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Self::PREFIX, self.0)
    }
}

impl FromStr for BlueprintId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, number) = s
            .split_once('/')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        if prefix != Self::PREFIX {
            return Err(IdParseError::InvalidPrefix(prefix.to_string()));
        }

        // i64::from_str accepts a leading '+', which is not part of the format
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdParseError::InvalidNumber(number.to_string()));
        }

        match number.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(IdParseError::InvalidNumber(number.to_string())),
        }
    }
}

impl Serialize for BlueprintId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlueprintId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing blueprint IDs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("invalid blueprint prefix: '{0}' (expected 'blueprint')")]
    InvalidPrefix(String),

    #[error("missing '/' delimiter in blueprint ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid blueprint number '{0}': expected a positive decimal integer")]
    InvalidNumber(String),
}
