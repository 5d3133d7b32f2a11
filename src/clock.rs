//! # Clock — Civil-Timezone Date and Time
//!
//! Every "today" comparison in the store (partition routing, overdue
//! detection) goes through a [`Clock`]. Store operations read the clock once
//! and pass the resulting date down, so a single request never observes two
//! different days.
//!
//! [`SystemClock`] converts the wall clock into a fixed IANA timezone
//! (`Asia/Tokyo` unless configured otherwise). [`FixedClock`] pins time for
//! tests.

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Format of the `created_at` / `completed_at` cells.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of due dates and `/date/{date}` path segments.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timezone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

pub trait Clock: Send + Sync {
    /// Current local date-time in the clock's civil timezone.
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock projected into a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Build from an IANA name such as `Asia/Tokyo` or `UTC`.
    pub fn from_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|e| anyhow!("unknown timezone {:?}: {}", name, e))?;
        Ok(Self::new(tz))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock pinned to 09:00:00 on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(9, 0, 0).unwrap_or_default())
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.guard() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.guard();
        *now += by;
    }

    fn guard(&self) -> MutexGuard<'_, NaiveDateTime> {
        self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.guard()
    }
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` string. Surrounding whitespace is ignored.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}
