//! Index configuration: divisors and constituent lists.
//!
//! Loaded from an optional JSON file and refined by command-line overrides:
//!
//! ```json
//! {
//!   "default_divisor": 0.14602128057775,
//!   "divisors": { "TECH": 2.0 },
//!   "constituents": { "TECH": ["AAPL", "MSFT"] }
//! }
//! ```
//!
//! Indexes without an explicit constituent list use every `@products` entry.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Catalog, CoreError, Divisors, ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    pub default_divisor: Option<f64>,
    pub divisors: BTreeMap<String, f64>,
    pub constituents: BTreeMap<String, Vec<String>>,
}

impl IndexConfig {
    /// Read a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            CoreError::Config(format!("cannot read {}: {error}", path.display()))
        })?;
        Self::from_json(&raw)
            .map_err(|error| CoreError::Config(format!("{}: {error}", path.display())))
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Apply a `NAME=VALUE` divisor override.
    pub fn apply_divisor_override(&mut self, raw: &str) -> Result<(), ValidationError> {
        let (index, value) = parse_divisor_override(raw)?;
        self.divisors.insert(index, value);
        Ok(())
    }

    /// Validated divisors, falling back to the DJIA divisor as default.
    pub fn divisors(&self) -> Result<Divisors, CoreError> {
        let mut divisors = match self.default_divisor {
            Some(default) => Divisors::new(default)?,
            None => Divisors::default(),
        };
        for (index, value) in &self.divisors {
            divisors = divisors.with_override(index.clone(), *value)?;
        }
        Ok(divisors)
    }

    /// Constituents of `index`: the configured list sorted and deduplicated, or
    /// every product of the catalog.
    pub fn constituents_for(&self, index: &str, catalog: &Catalog) -> Vec<String> {
        match self.constituents.get(index) {
            Some(configured) => {
                let mut constituents = configured.clone();
                constituents.sort();
                constituents.dedup();
                constituents
            }
            None => catalog.products().to_vec(),
        }
    }

    /// Names referenced by the configuration that the catalog does not list as indexes.
    pub fn unknown_indexes<'a>(&'a self, catalog: &'a Catalog) -> Vec<&'a str> {
        let mut unknown: Vec<&str> = self
            .divisors
            .keys()
            .chain(self.constituents.keys())
            .map(String::as_str)
            .filter(|index| !catalog.indexes().iter().any(|known| known == index))
            .collect();
        unknown.sort_unstable();
        unknown.dedup();
        unknown
    }
}

/// Split `NAME=VALUE` into an index name and a divisor.
///
/// The value is only parsed here; positivity is checked when building [`Divisors`].
pub fn parse_divisor_override(raw: &str) -> Result<(String, f64), ValidationError> {
    let malformed = || ValidationError::MalformedDivisor {
        value: raw.to_string(),
    };

    let (name, value) = raw.split_once('=').ok_or_else(malformed)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed());
    }
    let value = value.trim().parse::<f64>().map_err(|_| malformed())?;
    Ok((name.to_string(), value))
}
