//! Daily materialization and the completion toggle.

use super::Database;
use super::lifetime::{adjust_lifetime_internal, check_achievements_internal, credit_day_internal};
use super::stats::recompute_stats_internal;
use super::streak::advance_streak_internal;
use super::templates::list_templates_internal;
use crate::clock::{format_date, weekday_index};
use crate::error::TrackerError;
use crate::types::{CompletedTask, DayType, TaskInstance, ToggleOutcome};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

const INSTANCE_COLUMNS: &str = "id, date, name, category, template_id, completed, completed_at";

pub fn parse_instance_row(row: &Row) -> rusqlite::Result<TaskInstance> {
    let category: String = row.get("category")?;
    let completed: i64 = row.get("completed")?;

    Ok(TaskInstance {
        id: row.get("id")?,
        date: row.get("date")?,
        name: row.get("name")?,
        category: category
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        template_id: row.get("template_id")?,
        completed: completed != 0,
        completed_at: row.get("completed_at")?,
    })
}

/// Instances of a date, main before optional, then by id.
pub(crate) fn list_instances_internal(conn: &Connection, date: &str) -> Result<Vec<TaskInstance>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INSTANCE_COLUMNS} FROM tasks WHERE date = ?1
         ORDER BY CASE category WHEN 'main' THEN 0 ELSE 1 END, id"
    ))?;
    let instances = stmt
        .query_map(params![date], parse_instance_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(instances)
}

pub(crate) fn get_instance_internal(conn: &Connection, task_id: i64) -> Result<Option<TaskInstance>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INSTANCE_COLUMNS} FROM tasks WHERE id = ?1"
    ))?;

    match stmt.query_row(params![task_id], parse_instance_row) {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Completed instances of a date in completion order.
pub(crate) fn completed_tasks_internal(conn: &Connection, date: &str) -> Result<Vec<CompletedTask>> {
    let mut stmt = conn.prepare(
        "SELECT name, category, completed_at FROM tasks
         WHERE date = ?1 AND completed = 1
         ORDER BY completed_at, id",
    )?;
    let tasks = stmt
        .query_map(params![date], |row| {
            let category: String = row.get(1)?;
            Ok(CompletedTask {
                name: row.get(0)?,
                category: category.parse().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                })?,
                completed_at: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

/// Ensure every template applying to `date` has an instance, then
/// recompute the date's stats.
///
/// Existing instances keep their completion state and their name/category;
/// only a stale `template_id` is re-linked. Running it twice is a no-op.
pub(crate) fn materialize_internal(
    conn: &Connection,
    date: NaiveDate,
    now: &str,
) -> Result<(Vec<TaskInstance>, DayType)> {
    let key = format_date(date);
    let weekday = weekday_index(date);
    let day_type = DayType::for_weekday(weekday);

    let mut created = 0;
    for template in list_templates_internal(conn, Some(weekday))? {
        let existing = conn.query_row(
            "SELECT id, template_id FROM tasks WHERE date = ?1 AND name = ?2",
            params![key, template.name],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?)),
        );

        match existing {
            Ok((id, linked)) => {
                if linked != Some(template.id) {
                    conn.execute(
                        "UPDATE tasks SET template_id = ?1 WHERE id = ?2",
                        params![template.id, id],
                    )?;
                }
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                created += conn.execute(
                    "INSERT OR IGNORE INTO tasks
                        (date, name, category, template_id, completed, created_at)
                     VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                    params![key, template.name, template.category.as_str(), template.id, now],
                )?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if created > 0 {
        debug!(date = %key, created, "Materialized task instances");
    }

    recompute_stats_internal(conn, date, now)?;
    Ok((list_instances_internal(conn, &key)?, day_type))
}

/// `HH:MM` part of a stored `YYYY-MM-DD HH:MM:SS` timestamp.
fn clock_time(timestamp: &str) -> Option<String> {
    timestamp.get(11..16).map(str::to_string)
}

impl Database {
    /// Produce or reuse the instances for `date`.
    pub fn materialize(&self, date: NaiveDate) -> Result<(Vec<TaskInstance>, DayType)> {
        let now = self.clock().timestamp();
        self.transact(|tx| materialize_internal(tx, date, &now))
    }

    pub fn get_task(&self, task_id: i64) -> Result<Option<TaskInstance>> {
        self.with_conn(|conn| get_instance_internal(conn, task_id))
    }

    /// Set the completion state of one of today's tasks.
    ///
    /// The flag write, stats recompute, streak update, ledger deltas, day
    /// credits and achievement check commit together or not at all. Setting
    /// a task to the state it already has changes no counter.
    pub fn toggle_task(&self, task_id: i64, completed: bool) -> Result<ToggleOutcome> {
        let today = self.clock().today();
        let today_key = format_date(today);
        let now = self.clock().timestamp();

        let outcome = self.transact(|tx| {
            let task = get_instance_internal(tx, task_id)?
                .filter(|t| t.date == today_key)
                .ok_or_else(|| TrackerError::task_not_found(task_id))?;

            let transition = task.completed != completed;
            let completed_at = match (task.completed, completed) {
                (_, false) => None,
                (true, true) => task.completed_at.clone(),
                (false, true) => Some(now.clone()),
            };

            if transition {
                tx.execute(
                    "UPDATE tasks SET completed = ?1, completed_at = ?2 WHERE id = ?3",
                    params![completed as i64, completed_at, task_id],
                )?;
            }

            let stats = recompute_stats_internal(tx, today, &now)?;
            if stats.is_valid_checkin {
                advance_streak_internal(tx, today)?;
            }

            if transition {
                let delta = if completed { 1 } else { -1 };
                adjust_lifetime_internal(tx, task.category, delta, &now)?;
            }
            credit_day_internal(tx, &stats, &now)?;

            let new_achievements = if transition && completed {
                check_achievements_internal(tx, today, &now)?
            } else {
                Vec::new()
            };

            Ok(ToggleOutcome {
                task_id,
                completed,
                completed_at: completed_at.as_deref().and_then(clock_time),
                stats,
                new_achievements,
            })
        })?;

        info!(
            task_id,
            completed,
            unlocked = outcome.new_achievements.len(),
            "Task toggled"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_time_slices_timestamp() {
        assert_eq!(clock_time("2026-10-12 09:05:33").as_deref(), Some("09:05"));
        assert_eq!(clock_time("short"), None);
    }
}
