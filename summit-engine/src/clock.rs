//! Clock port for calendar-day reasoning.
//!
//! The engine never reads the system clock directly; "today" always means
//! the calendar day in the user's configured time zone, supplied through
//! this trait so decay and day-boundary logic is replayable in tests.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Source of the current instant and the user-local calendar day.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day an instant falls on in the user's time zone.
    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate;

    /// Today's calendar day in the user's time zone.
    fn today(&self) -> NaiveDate {
        self.local_date(self.now())
    }
}

/// Wall-clock implementation pinned to a user's UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct OffsetClock {
    offset: FixedOffset,
}

impl OffsetClock {
    #[must_use]
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Clock for a user with no configured time zone.
    #[must_use]
    pub fn utc() -> Self {
        Self {
            offset: FixedOffset::east_opt(0).expect("zero offset is valid"),
        }
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }
}

/// Frozen clock for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            offset: FixedOffset::east_opt(0).expect("zero offset is valid"),
        }
    }

    #[must_use]
    pub const fn with_offset(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    /// Move the frozen instant, keeping the offset.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }
}
