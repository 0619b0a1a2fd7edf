use std::fmt::{Display, Formatter};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Span of the trailing window used for every "latest value" query.
pub const DEFAULT_WINDOW_SPAN: Duration = Duration::DAY;

/// Half-open time interval `[start, end)` evaluated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregationWindow {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl AggregationWindow {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::EmptyWindow);
        }
        Ok(Self {
            start: truncate_to_micros(start.to_offset(UtcOffset::UTC)),
            end: truncate_to_micros(end.to_offset(UtcOffset::UTC)),
        })
    }

    /// Window of `span` ending at `end`. A non-positive span collapses to one second.
    pub fn trailing(end: OffsetDateTime, span: Duration) -> Self {
        let span = if span.is_positive() {
            span
        } else {
            Duration::SECOND
        };
        let end = truncate_to_micros(end.to_offset(UtcOffset::UTC));
        Self {
            start: truncate_to_micros(end - span),
            end,
        }
    }

    /// The one-day window ending at `now`.
    pub fn trailing_day(now: OffsetDateTime) -> Self {
        Self::trailing(now, DEFAULT_WINDOW_SPAN)
    }

    pub const fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub const fn end(&self) -> OffsetDateTime {
        self.end
    }

    /// Membership at microsecond precision, the resolution stores keep.
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        let ts = truncate_to_micros(ts);
        self.start <= ts && ts < self.end
    }
}

impl Display for AggregationWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", format_rfc3339(self.start), format_rfc3339(self.end))
    }
}

impl Serialize for AggregationWindow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("AggregationWindow", 2)?;
        state.serialize_field("start", &format_rfc3339(self.start))?;
        state.serialize_field("end", &format_rfc3339(self.end))?;
        state.end()
    }
}

/// Drop the sub-microsecond part of `ts`.
pub fn truncate_to_micros(ts: OffsetDateTime) -> OffsetDateTime {
    ts - Duration::nanoseconds(i64::from(ts.nanosecond() % 1_000))
}

/// RFC3339 rendering used in reports and error messages.
pub fn format_rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339)
        .unwrap_or_else(|_| String::from("<unformattable>"))
}
