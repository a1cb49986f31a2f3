use core::{fmt, str::FromStr};
use dataservice_core::{Error, Result};
use std::collections::HashMap;

/// A single `name=value` pair of the number table.
///
/// Parsed from the `--numbers` argument (or `NUMBERS` environment variable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberEntry {
    pub name: String,
    pub value: i32,
}

impl FromStr for NumberEntry {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected `name=value`, got `{s}`"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("empty name in `{s}`"));
        }
        let value = value
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("invalid value for `{name}`: {e}"))?;
        Ok(Self {
            name: name.to_string(),
            value,
        })
    }
}

impl fmt::Display for NumberEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Name to integer mapping served by `GetNumber`.
///
/// Names are matched exactly (case-sensitive). Uniqueness of names is enforced
/// when the configuration is validated; if duplicates reach this type anyway,
/// the last entry wins.
#[derive(Debug, Clone, Default)]
pub struct NumberTable {
    numbers: HashMap<String, i32>,
}

impl NumberTable {
    /// Looks up the number registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NumberNotFound`] when `name` has no mapping.
    pub fn get(&self, name: &str) -> Result<i32> {
        self.numbers
            .get(name)
            .copied()
            .ok_or_else(|| Error::NumberNotFound {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

impl FromIterator<NumberEntry> for NumberTable {
    fn from_iter<I: IntoIterator<Item = NumberEntry>>(iter: I) -> Self {
        Self {
            numbers: iter
                .into_iter()
                .map(|entry| (entry.name, entry.value))
                .collect(),
        }
    }
}
