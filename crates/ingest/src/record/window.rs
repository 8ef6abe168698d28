use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum WindowError {
    #[error("lookback must be a positive number of hours, got {0}")]
    InvalidHours(f64),
    #[error("window start {start} is not before end {end}")]
    Inverted { start: DateTime<Utc>, end: DateTime<Utc> },
}

/// Half-open interval `[start, end)` being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// `[now - hours, now)`. Fractional hours are honored to the millisecond.
    pub fn last_hours(hours: f64, now: DateTime<Utc>) -> Result<Self, WindowError> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(WindowError::InvalidHours(hours));
        }
        let millis = (hours * 3_600_000.0).round() as i64;
        let span = Duration::try_milliseconds(millis).ok_or(WindowError::InvalidHours(hours))?;
        let start = now.checked_sub_signed(span).ok_or(WindowError::InvalidHours(hours))?;
        Self::new(start, now)
    }

    #[inline]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Last representable instant inside the window.
    pub fn latest(&self) -> DateTime<Utc> {
        self.end - Duration::microseconds(1)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
