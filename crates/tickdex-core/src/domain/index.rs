use serde::Serialize;

use super::AggregationWindow;

/// Latest value of one constituent inside the aggregation window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstituentValue {
    pub instrument: String,
    pub value: f64,
}

/// Result of one index computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexValue {
    pub index: String,
    pub value: f64,
    /// Sum of the constituent values before normalization.
    pub sum: f64,
    pub divisor: f64,
    pub window: AggregationWindow,
    /// Per-constituent breakdown in catalog order. Empty unless requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constituents: Vec<ConstituentValue>,
}

impl IndexValue {
    /// Constituent value by instrument name, if the breakdown was requested.
    pub fn constituent(&self, instrument: &str) -> Option<f64> {
        self.constituents
            .iter()
            .find(|constituent| constituent.instrument == instrument)
            .map(|constituent| constituent.value)
    }
}
