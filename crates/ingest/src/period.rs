use std::fmt;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};

use crate::error::IngestError;

/// Half-open interval `[start, end)` of the requested data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IngestError> {
        if end <= start {
            return Err(IngestError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Calendar months covered by the period, as first-of-month dates.
    ///
    /// Anchors are `start + k months` for k = 0, 1, ..; a month is included
    /// while its anchor is strictly before `end`.
    pub fn months(&self) -> Vec<NaiveDate> {
        let mut months = Vec::new();
        let mut k = 0u32;
        while let Some(anchor) = self.start.checked_add_months(Months::new(k)) {
            if anchor >= self.end {
                break;
            }
            months.push(first_of_month(anchor.date_naive()));
            k += 1;
        }
        months
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(date.day0() as u64)
}

/// Start of the calendar month containing `now`, in UTC. Used when the
/// caller does not supply an end instant.
pub fn default_end(now: DateTime<Utc>) -> DateTime<Utc> {
    first_of_month(now.date_naive()).and_time(NaiveTime::MIN).and_utc()
}
