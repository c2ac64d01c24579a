//! Civil-time clock.
//!
//! Every date key in the store is a `YYYY-MM-DD` string computed in one fixed
//! UTC offset, independent of the host timezone. The clock can be pinned to a
//! given instant so day-boundary behaviour is reproducible in tests.

use crate::error::TrackerError;
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Date format used for every stored date key.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format for `completed_at` and export times.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default civil offset (UTC+08:00).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

/// Source of "now" in the configured civil timezone.
#[derive(Debug, Clone)]
pub struct Clock {
    offset: FixedOffset,
    /// Pinned unix timestamp in seconds; `None` follows the system clock.
    pinned: Option<Arc<AtomicI64>>,
}

impl Clock {
    /// System clock in the given UTC offset (hours east of UTC).
    pub fn with_offset_hours(hours: i32) -> anyhow::Result<Self> {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| anyhow::anyhow!("UTC offset out of range: {} hours", hours))?;
        Ok(Self {
            offset,
            pinned: None,
        })
    }

    /// Clock pinned to a civil `YYYY-MM-DD HH:MM:SS` instant in the default offset.
    pub fn pinned_at(civil: &str) -> anyhow::Result<Self> {
        let offset = FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
            .ok_or_else(|| anyhow::anyhow!("invalid default offset"))?;
        let naive = NaiveDateTime::parse_from_str(civil, TIMESTAMP_FORMAT)?;
        let local = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| anyhow::anyhow!("ambiguous civil time: {}", civil))?;
        Ok(Self {
            offset,
            pinned: Some(Arc::new(AtomicI64::new(local.timestamp()))),
        })
    }

    /// Current instant in the civil offset.
    pub fn now(&self) -> DateTime<FixedOffset> {
        let utc = match &self.pinned {
            Some(secs) => Utc
                .timestamp_opt(secs.load(Ordering::Relaxed), 0)
                .single()
                .unwrap_or_else(Utc::now),
            None => Utc::now(),
        };
        utc.with_timezone(&self.offset)
    }

    /// Today's civil date.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Today's date key.
    pub fn today_key(&self) -> String {
        format_date(self.today())
    }

    /// Full timestamp for `completed_at` columns.
    pub fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }

    /// Move a pinned clock forward. No effect on a system clock.
    pub fn advance(&self, by: Duration) {
        if let Some(secs) = &self.pinned {
            secs.fetch_add(by.num_seconds(), Ordering::Relaxed);
        }
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
                .unwrap_or_else(|| Utc.fix()),
            pinned: None,
        }
    }
}

/// Parse a strict `YYYY-MM-DD` date key.
pub fn parse_date(s: &str) -> Result<NaiveDate, TrackerError> {
    // chrono accepts unpadded fields; keys must be exactly 10 chars.
    if s.len() != 10 {
        return Err(TrackerError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| TrackerError::InvalidDate(s.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Weekday index, 0 = Monday .. 6 = Sunday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Short English weekday label for an index.
pub fn weekday_label(index: u8) -> &'static str {
    match index {
        0 => "Mon",
        1 => "Tue",
        2 => "Wed",
        3 => "Thu",
        4 => "Fri",
        5 => "Sat",
        _ => "Sun",
    }
}
