//! Price-weighted index computation.
//!
//! An index value is the sum of its constituents' latest values divided by the
//! index divisor:
//!
//! ```text
//! value = (v_1 + v_2 + ... + v_n) / divisor
//! ```
//!
//! Constituents are summed in catalog order so repeated computations over the
//! same data produce bit-identical results.

use std::collections::{BTreeMap, BTreeSet};

use crate::fetcher::ValueFetcher;
use crate::store::TimeSeriesStore;
use crate::{AggregationWindow, Catalog, ConstituentValue, CoreError, IndexValue};

/// Divisor of the Dow Jones Industrial Average used when nothing else is configured.
pub const DOW_DIVISOR: f64 = 0.14602128057775;

/// Per-index divisors with a shared default.
#[derive(Debug, Clone, PartialEq)]
pub struct Divisors {
    default: f64,
    overrides: BTreeMap<String, f64>,
}

impl Default for Divisors {
    fn default() -> Self {
        Self {
            default: DOW_DIVISOR,
            overrides: BTreeMap::new(),
        }
    }
}

impl Divisors {
    /// Divisors using `default` for every index.
    pub fn new(default: f64) -> Result<Self, CoreError> {
        check_divisor("*", default)?;
        Ok(Self {
            default,
            overrides: BTreeMap::new(),
        })
    }

    /// Set the divisor of one index.
    pub fn with_override(mut self, index: impl Into<String>, value: f64) -> Result<Self, CoreError> {
        let index = index.into();
        check_divisor(&index, value)?;
        self.overrides.insert(index, value);
        Ok(self)
    }

    pub fn for_index(&self, index: &str) -> f64 {
        self.overrides.get(index).copied().unwrap_or(self.default)
    }
}

fn check_divisor(index: &str, value: f64) -> Result<(), CoreError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidDivisor {
            index: index.to_string(),
            value,
        })
    }
}

/// Computes index values from constituent prices.
#[derive(Debug, Clone)]
pub struct IndexAggregator {
    divisors: Divisors,
    products: BTreeSet<String>,
}

impl IndexAggregator {
    /// Aggregator accepting the products of `catalog` as constituents.
    pub fn new(divisors: Divisors, catalog: &Catalog) -> Self {
        Self {
            divisors,
            products: catalog.products().iter().cloned().collect(),
        }
    }

    /// Compute one index over `constituents` inside `window`.
    ///
    /// With `report_each` the result carries every constituent value in the
    /// order given.
    ///
    /// # Errors
    ///
    /// Any constituent failure fails the whole index; no partial value is
    /// produced. An empty constituent list yields [`CoreError::NoConstituents`]
    /// and a constituent outside `@products` yields
    /// [`CoreError::UnknownInstrument`].
    pub async fn compute<S>(
        &self,
        store: &S,
        index: &str,
        constituents: &[String],
        window: AggregationWindow,
        report_each: bool,
    ) -> Result<IndexValue, CoreError>
    where
        S: TimeSeriesStore + ?Sized,
    {
        if constituents.is_empty() {
            return Err(CoreError::NoConstituents {
                index: index.to_string(),
            });
        }
        if let Some(unknown) = constituents
            .iter()
            .find(|instrument| !self.products.contains(instrument.as_str()))
        {
            return Err(CoreError::UnknownInstrument {
                index: index.to_string(),
                instrument: unknown.clone(),
            });
        }

        let divisor = self.divisors.for_index(index);
        let mut sum = 0.0;
        let mut breakdown = Vec::new();
        for instrument in constituents {
            let value = ValueFetcher::latest(store, instrument, window).await?;
            sum += value;
            if report_each {
                breakdown.push(ConstituentValue {
                    instrument: instrument.clone(),
                    value,
                });
            }
        }

        Ok(IndexValue {
            index: index.to_string(),
            value: sum / divisor,
            sum,
            divisor,
            window,
            constituents: breakdown,
        })
    }
}
