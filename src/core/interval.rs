use std::fmt::{Debug, Formatter};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Half-open reading interval in the offset it was reported in.
#[derive(Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Interval {
    /// Inclusive.
    #[serde(rename = "startAt")]
    pub start: DateTime<FixedOffset>,

    /// Exclusive.
    #[serde(rename = "endAt")]
    pub end: DateTime<FixedOffset>,
}

impl Debug for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

impl Interval {
    pub const fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    /// Calendar day of the interval start, in the interval's own offset.
    #[must_use]
    pub fn day(self) -> NaiveDate {
        self.start.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_uses_own_offset() {
        // 23:30 at +01:00 is still the 10th locally, even though it is 22:30 UTC.
        let start = DateTime::parse_from_rfc3339("2025-06-10T23:30:00+01:00").unwrap();
        let end = DateTime::parse_from_rfc3339("2025-06-11T00:00:00+01:00").unwrap();
        assert_eq!(Interval::new(start, end).day(), NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
    }
}
