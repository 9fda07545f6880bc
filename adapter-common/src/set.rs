//! Immutable snapshot of the adapter properties

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;

use crate::{properties, ConfigError, Result};

/// Key/value configuration loaded once from the properties file
#[derive(Debug, Clone)]
pub struct ConfigurationSet {
    entries: HashMap<String, String>,
    loaded_at: DateTime<Utc>,
}

impl ConfigurationSet {
    /// Build a set from already parsed entries
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self {
            entries,
            loaded_at: Utc::now(),
        }
    }

    /// Parse properties text
    pub fn parse(input: &str) -> std::result::Result<Self, properties::ParseError> {
        properties::parse(input).map(Self::new)
    }

    /// Value for `name`, trimmed; `None` when absent, empty or all whitespace
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Value as stored, including blank values
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Required value; blank counts as missing
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| ConfigError::MissingProperty(name.to_string()))
    }

    /// Parse a value with `FromStr`, `None` when absent or blank
    pub fn get_parsed<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| ConfigError::InvalidValue {
                key: name.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Parse a value, falling back to `default` when absent or blank
    pub fn get_or<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.get_parsed(name)?.unwrap_or(default))
    }

    /// Whether the key exists at all (blank values included)
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Keys in the set
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries, blank ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the snapshot was taken
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
