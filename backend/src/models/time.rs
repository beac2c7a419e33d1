use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::{SamplerError, SamplerResult};

/// UTC instant used for every query boundary.
pub type Timestamp = DateTime<Utc>;

/// Layout used when printing interval boundaries.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// `%.f` also accepts a missing fractional part.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp string.
///
/// Accepts `YYYY-MM-DD HH:MM:SS[.fff]`, the same with a `T` separator, RFC 3339
/// with an explicit offset, and bare dates (midnight). Values without an offset
/// are taken as UTC.
pub fn parse_timestamp(value: &str) -> SamplerResult<Timestamp> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Some(naive) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(SamplerError::InvalidInterval(format!(
        "cannot parse '{}' as a timestamp",
        value
    )))
}

/// Anything that can be normalized into a [`Timestamp`].
pub trait IntoTimestamp {
    fn into_timestamp(self) -> SamplerResult<Timestamp>;
}

impl IntoTimestamp for Timestamp {
    fn into_timestamp(self) -> SamplerResult<Timestamp> {
        Ok(self)
    }
}

impl IntoTimestamp for NaiveDateTime {
    fn into_timestamp(self) -> SamplerResult<Timestamp> {
        Ok(Utc.from_utc_datetime(&self))
    }
}

impl IntoTimestamp for &str {
    fn into_timestamp(self) -> SamplerResult<Timestamp> {
        parse_timestamp(self)
    }
}

impl IntoTimestamp for String {
    fn into_timestamp(self) -> SamplerResult<Timestamp> {
        parse_timestamp(&self)
    }
}

impl IntoTimestamp for &String {
    fn into_timestamp(self) -> SamplerResult<Timestamp> {
        parse_timestamp(self)
    }
}

/// A validated time range with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeInterval {
    start: Timestamp,
    end: Timestamp,
}

impl TimeInterval {
    /// Create an interval, rejecting empty or inverted ranges.
    pub fn new(start: Timestamp, end: Timestamp) -> SamplerResult<Self> {
        if start >= end {
            return Err(SamplerError::InvalidInterval(format!(
                "start {} is not before end {}",
                start.format(DISPLAY_FORMAT),
                end.format(DISPLAY_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// Normalize two timestamp-like values and validate their order.
    pub fn parse(start: impl IntoTimestamp, end: impl IntoTimestamp) -> SamplerResult<Self> {
        Self::new(start.into_timestamp()?, end.into_timestamp()?)
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Elapsed whole minutes, fractional minutes dropped.
    pub fn whole_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Inclusive on both ends, matching how the archive filters on time.
    pub fn contains(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Boundaries of `n` equal-width sub-intervals.
    ///
    /// Returns `n + 1` strictly increasing instants; the first is `start` and the
    /// last is exactly `end`. Widths differ by at most one nanosecond.
    pub fn partition(&self, n: usize) -> SamplerResult<Vec<Timestamp>> {
        if n == 0 {
            return Err(SamplerError::InvalidInterval(
                "cannot partition an interval into zero sub-intervals".to_string(),
            ));
        }

        let total = self.duration().num_nanoseconds().ok_or_else(|| {
            SamplerError::InvalidInterval(format!("interval {} is too long to partition", self))
        })?;

        if (n as i128) > (total as i128) {
            return Err(SamplerError::InvalidInterval(format!(
                "interval {} is too short for {} sub-intervals",
                self, n
            )));
        }

        let mut boundaries = Vec::with_capacity(n + 1);
        for i in 0..n {
            let offset = (total as i128 * i as i128 / n as i128) as i64;
            boundaries.push(self.start + Duration::nanoseconds(offset));
        }
        boundaries.push(self.end);

        Ok(boundaries)
    }

    /// Split into `n` contiguous, non-overlapping sub-intervals.
    pub fn split(&self, n: usize) -> SamplerResult<Vec<TimeInterval>> {
        self.partition(n)?
            .windows(2)
            .map(|pair| TimeInterval::new(pair[0], pair[1]))
            .collect()
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -- {}",
            self.start.format(DISPLAY_FORMAT),
            self.end.format(DISPLAY_FORMAT)
        )
    }
}

/// Normalize and validate a pair of timestamp-like inputs.
pub fn validate_time_interval(
    start: impl IntoTimestamp,
    end: impl IntoTimestamp,
) -> SamplerResult<TimeInterval> {
    TimeInterval::parse(start, end)
}

/// `n_partitions + 1` boundaries splitting `[start, end]` into equal widths.
pub fn partition_time_interval(
    start: Timestamp,
    end: Timestamp,
    n_partitions: usize,
) -> SamplerResult<Vec<Timestamp>> {
    TimeInterval::new(start, end)?.partition(n_partitions)
}
