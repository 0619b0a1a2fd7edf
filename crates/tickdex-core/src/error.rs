use thiserror::Error;

use crate::store::StoreError;

/// Validation errors for domain values and configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tag cannot be empty")]
    EmptyTag,
    #[error("tag must start with '@': '{value}'")]
    TagMissingPrefix { value: String },
    #[error("tag contains whitespace: '{value}'")]
    TagContainsWhitespace { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("refresh interval must be at least one second")]
    NonPositiveInterval,

    #[error("refresh interval of {seconds} seconds is out of range")]
    IntervalTooLarge { seconds: u64 },

    #[error("window end must be after window start")]
    EmptyWindow,

    #[error("divisor override must look like NAME=VALUE: '{value}'")]
    MalformedDivisor { value: String },
}

/// Top-level error type for catalog discovery and index computation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("required tag '{tag}' not found in store")]
    TagNotFound { tag: String },

    #[error("entry '{entry}' not found in store")]
    EntryNotFound { entry: String },

    #[error("no data for '{entry}' in window [{start}, {end})")]
    NoDataInWindow {
        entry: String,
        start: String,
        end: String,
    },

    #[error("index '{index}' references '{instrument}' which is not a known product")]
    UnknownInstrument { index: String, instrument: String },

    #[error("index '{index}' has no constituents")]
    NoConstituents { index: String },

    #[error("divisor for '{index}' must be positive and finite, got {value}")]
    InvalidDivisor { index: String, value: f64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Stable machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable { .. } => "store.unavailable",
            Self::TagNotFound { .. } => "catalog.tag_not_found",
            Self::EntryNotFound { .. } => "store.entry_not_found",
            Self::NoDataInWindow { .. } => "fetch.no_data_in_window",
            Self::UnknownInstrument { .. } => "index.unknown_instrument",
            Self::NoConstituents { .. } => "index.no_constituents",
            Self::InvalidDivisor { .. } => "config.invalid_divisor",
            Self::Validation(_) => "validation",
            Self::Config(_) => "config.invalid",
            Self::Io(_) => "io",
        }
    }

    /// Whether the next refresh pass may succeed where this one failed.
    pub const fn transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::NoDataInWindow { .. }
        )
    }
}

impl From<StoreError> for CoreError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(message) => Self::StoreUnavailable { message },
            StoreError::TagNotFound(tag) => Self::TagNotFound { tag },
            StoreError::EntryNotFound(entry) => Self::EntryNotFound { entry },
            StoreError::ColumnNotFound { entry, column } => Self::EntryNotFound {
                entry: format!("{entry}.{column}"),
            },
        }
    }
}
