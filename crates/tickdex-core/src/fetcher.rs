use crate::store::{TimeSeriesStore, VALUE_COLUMN};
use crate::{format_rfc3339, AggregationWindow, CoreError, ValidationError};

/// Reads the latest `value` of an instrument inside a window.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueFetcher;

impl ValueFetcher {
    /// Latest value of `instrument` with a timestamp in `window`.
    ///
    /// # Errors
    ///
    /// [`CoreError::NoDataInWindow`] when the window is empty for this instrument;
    /// a missing value is never read as zero.
    pub async fn latest<S>(
        store: &S,
        instrument: &str,
        window: AggregationWindow,
    ) -> Result<f64, CoreError>
    where
        S: TimeSeriesStore + ?Sized,
    {
        let value = store
            .query_last_value(instrument, VALUE_COLUMN, window)
            .await?;
        log::debug!("fetched {instrument}.{VALUE_COLUMN} in {window}: {value:?}");

        match value {
            Some(value) if value.is_finite() => Ok(value),
            Some(_) => Err(ValidationError::NonFiniteValue {
                field: VALUE_COLUMN,
            }
            .into()),
            None => Err(CoreError::NoDataInWindow {
                entry: instrument.to_string(),
                start: format_rfc3339(window.start()),
                end: format_rfc3339(window.end()),
            }),
        }
    }
}
