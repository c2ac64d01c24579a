//! Streak tracker over the singleton `streak_record` row.

use super::Database;
use crate::clock::{format_date, parse_date};
use crate::types::StreakInfo;
use anyhow::Result;
use chrono::{Days, NaiveDate};
use rusqlite::{Connection, params};
use tracing::debug;

/// Raw row, no decay applied.
pub(crate) fn get_streak_internal(conn: &Connection) -> Result<StreakInfo> {
    let streak = conn.query_row(
        "SELECT current_streak, max_streak, last_checkin_date FROM streak_record WHERE id = 1",
        [],
        |row| {
            Ok(StreakInfo {
                current: row.get(0)?,
                max: row.get(1)?,
                last_checkin_date: row.get(2)?,
            })
        },
    )?;
    Ok(streak)
}

/// True when `last` is `today` or the day before.
fn is_live(last: &str, today: NaiveDate) -> bool {
    match parse_date(last) {
        Ok(last) => last == today || today.checked_sub_days(Days::new(1)) == Some(last),
        Err(_) => false,
    }
}

/// Read the streak as of `today`, persisting the decay to 0 once the last
/// check-in is more than one day behind.
pub(crate) fn read_streak_internal(conn: &Connection, today: NaiveDate) -> Result<StreakInfo> {
    let mut streak = get_streak_internal(conn)?;

    let stale = match &streak.last_checkin_date {
        Some(last) => !is_live(last, today),
        None => false,
    };

    if stale && streak.current != 0 {
        conn.execute(
            "UPDATE streak_record SET current_streak = 0 WHERE id = 1",
            [],
        )?;
        debug!(last = ?streak.last_checkin_date, "Streak decayed");
        streak.current = 0;
    }

    Ok(streak)
}

/// Count a valid check-in on `date`. The caller decides validity.
pub(crate) fn advance_streak_internal(conn: &Connection, date: NaiveDate) -> Result<StreakInfo> {
    let streak = get_streak_internal(conn)?;
    let key = format_date(date);

    let current = match streak.last_checkin_date.as_deref() {
        Some(last) if last == key => return Ok(streak),
        Some(last)
            if date
                .checked_sub_days(Days::new(1))
                .is_some_and(|prev| format_date(prev) == last) =>
        {
            streak.current + 1
        }
        _ => 1,
    };
    let max = streak.max.max(current);

    conn.execute(
        "UPDATE streak_record
         SET current_streak = ?1, max_streak = ?2, last_checkin_date = ?3
         WHERE id = 1",
        params![current, max, key],
    )?;

    Ok(StreakInfo {
        current,
        max,
        last_checkin_date: Some(key),
    })
}

impl Database {
    /// Streak as of the clock's today.
    pub fn get_streak(&self) -> Result<StreakInfo> {
        let today = self.clock().today();
        self.transact(|tx| read_streak_internal(tx, today))
    }

    /// Record a valid check-in on `date`.
    pub fn update_streak(&self, date: NaiveDate) -> Result<StreakInfo> {
        self.transact(|tx| advance_streak_internal(tx, date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_is_live_window() {
        let today = date("2026-10-14");
        assert!(is_live("2026-10-14", today));
        assert!(is_live("2026-10-13", today));
        assert!(!is_live("2026-10-12", today));
        assert!(!is_live("garbage", today));
    }

    #[test]
    fn test_advance_increments_resets_and_holds() {
        let db = Database::open_in_memory().unwrap();

        let s = db.update_streak(date("2026-10-12")).unwrap();
        assert_eq!((s.current, s.max), (1, 1));

        let s = db.update_streak(date("2026-10-13")).unwrap();
        assert_eq!((s.current, s.max), (2, 2));

        // Same day again is a no-op.
        let s = db.update_streak(date("2026-10-13")).unwrap();
        assert_eq!((s.current, s.max), (2, 2));

        // Gap resets to 1, max is kept.
        let s = db.update_streak(date("2026-10-16")).unwrap();
        assert_eq!((s.current, s.max), (1, 2));
        assert_eq!(s.last_checkin_date.as_deref(), Some("2026-10-16"));
    }

    #[test]
    fn test_read_decays_and_persists() {
        let db = Database::open_in_memory().unwrap();
        db.update_streak(date("2026-10-12")).unwrap();
        db.update_streak(date("2026-10-13")).unwrap();

        let s = db
            .with_conn(|conn| read_streak_internal(conn, date("2026-10-14")))
            .unwrap();
        assert_eq!(s.current, 2);

        let s = db
            .with_conn(|conn| read_streak_internal(conn, date("2026-10-15")))
            .unwrap();
        assert_eq!((s.current, s.max), (0, 2));

        let raw = db.with_conn(get_streak_internal).unwrap();
        assert_eq!(raw.current, 0);
        assert_eq!(raw.max, 2);
    }
}
