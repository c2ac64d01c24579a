//! Per-day aggregation over task instances.
//!
//! Daily stats are a materialized view: every write recomputes the whole row
//! from the date's instances and upserts it. Nothing patches counts in place.

use super::Database;
use crate::clock::{format_date, parse_date, weekday_index};
use crate::types::{DailyStats, DayType};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};

/// `completed / total * 100`, or 0 for an empty partition.
pub fn rate(completed: i64, total: i64) -> f64 {
    if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// A stats row plus the day-ledger flags that survive recomputation.
#[derive(Debug, Clone)]
pub(crate) struct StoredStats {
    pub stats: DailyStats,
    pub credited_checkin: bool,
    pub credited_perfect: bool,
}

pub fn parse_stats_row(row: &Row) -> rusqlite::Result<DailyStats> {
    let date: String = row.get("date")?;
    let day_type: String = row.get("day_type")?;
    let valid: i64 = row.get("valid_checkin")?;
    let perfect: i64 = row.get("perfect")?;

    let day_type = DayType::from_label(&day_type)
        .or_else(|| {
            parse_date(&date)
                .ok()
                .map(|d| DayType::for_weekday(weekday_index(d)))
        })
        .unwrap_or(DayType::Flex);

    Ok(DailyStats {
        date,
        day_type,
        total: row.get("total_tasks")?,
        completed: row.get("total_completed")?,
        rate: row.get("completion_rate")?,
        main_total: row.get("main_tasks")?,
        main_completed: row.get("main_completed")?,
        main_rate: row.get("main_rate")?,
        optional_total: row.get("optional_tasks")?,
        optional_completed: row.get("optional_completed")?,
        is_valid_checkin: valid != 0,
        is_perfect: perfect != 0,
    })
}

/// Aggregate the date's instances without writing anything.
pub(crate) fn compute_stats_internal(conn: &Connection, date: NaiveDate) -> Result<DailyStats> {
    let key = format_date(date);
    let day_type = DayType::for_weekday(weekday_index(date));

    let mut stmt = conn.prepare(
        "SELECT category, COUNT(*), COALESCE(SUM(completed), 0)
         FROM tasks WHERE date = ?1 GROUP BY category",
    )?;
    let rows = stmt
        .query_map(params![key], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let (mut main_total, mut main_completed) = (0, 0);
    let (mut optional_total, mut optional_completed) = (0, 0);
    for (category, total, completed) in rows {
        match category.as_str() {
            "main" => {
                main_total = total;
                main_completed = completed;
            }
            _ => {
                optional_total = total;
                optional_completed = completed;
            }
        }
    }

    let total = main_total + optional_total;
    let completed = main_completed + optional_completed;

    // A day without main tasks can never be a valid check-in.
    let is_valid_checkin = main_total > 0 && main_completed >= main_total;
    let is_perfect = is_valid_checkin && optional_completed >= optional_total;

    Ok(DailyStats {
        date: key,
        day_type,
        total,
        completed,
        rate: rate(completed, total),
        main_total,
        main_completed,
        main_rate: rate(main_completed, main_total),
        optional_total,
        optional_completed,
        is_valid_checkin,
        is_perfect,
    })
}

/// Recompute and upsert the date's row. Ledger flags are left untouched.
pub(crate) fn recompute_stats_internal(
    conn: &Connection,
    date: NaiveDate,
    updated_at: &str,
) -> Result<DailyStats> {
    let stats = compute_stats_internal(conn, date)?;

    conn.execute(
        "INSERT INTO daily_stats
            (date, total_tasks, total_completed, main_tasks, main_completed,
             optional_tasks, optional_completed, completion_rate, main_rate,
             day_type, valid_checkin, perfect, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(date) DO UPDATE SET
            total_tasks = excluded.total_tasks,
            total_completed = excluded.total_completed,
            main_tasks = excluded.main_tasks,
            main_completed = excluded.main_completed,
            optional_tasks = excluded.optional_tasks,
            optional_completed = excluded.optional_completed,
            completion_rate = excluded.completion_rate,
            main_rate = excluded.main_rate,
            day_type = excluded.day_type,
            valid_checkin = excluded.valid_checkin,
            perfect = excluded.perfect,
            updated_at = excluded.updated_at",
        params![
            stats.date,
            stats.total,
            stats.completed,
            stats.main_total,
            stats.main_completed,
            stats.optional_total,
            stats.optional_completed,
            stats.rate,
            stats.main_rate,
            stats.day_type.label(),
            stats.is_valid_checkin as i64,
            stats.is_perfect as i64,
            updated_at,
        ],
    )?;

    Ok(stats)
}

pub(crate) fn get_stored_stats_internal(conn: &Connection, date: &str) -> Result<Option<StoredStats>> {
    let mut stmt = conn.prepare("SELECT * FROM daily_stats WHERE date = ?1")?;
    let result = stmt.query_row(params![date], |row| {
        let credited_checkin: i64 = row.get("credited_checkin")?;
        let credited_perfect: i64 = row.get("credited_perfect")?;
        Ok(StoredStats {
            stats: parse_stats_row(row)?,
            credited_checkin: credited_checkin != 0,
            credited_perfect: credited_perfect != 0,
        })
    });

    match result {
        Ok(stored) => Ok(Some(stored)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Stored rows in `[start, end]`, newest first.
pub(crate) fn stats_in_range_internal(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Vec<DailyStats>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM daily_stats WHERE date >= ?1 AND date <= ?2 ORDER BY date DESC",
    )?;
    let rows = stmt
        .query_map(params![start, end], parse_stats_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

impl Database {
    /// Recompute and persist the stats row for `date`.
    pub fn compute_daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        let now = self.clock().timestamp();
        self.transact(|tx| recompute_stats_internal(tx, date, &now))
    }

    /// The stored row for `date`, if one has been computed.
    pub fn get_daily_stats(&self, date: NaiveDate) -> Result<Option<DailyStats>> {
        self.with_conn(|conn| {
            Ok(get_stored_stats_internal(conn, &format_date(date))?.map(|stored| stored.stats))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_handles_empty_partition() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(3, 0), 0.0);
        assert_eq!(rate(1, 4), 25.0);
        assert_eq!(rate(2, 2), 100.0);
    }
}
