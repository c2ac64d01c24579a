//! Read views: today, the trailing week and past days.

use super::Database;
use super::lifetime::{get_lifetime_internal, list_achievements_internal};
use super::stats::{get_stored_stats_internal, stats_in_range_internal};
use super::streak::read_streak_internal;
use super::tasks::{completed_tasks_internal, list_instances_internal, materialize_internal};
use crate::clock::{format_date, parse_date, weekday_index, weekday_label};
use crate::types::{
    Category, HistoryDay, HistoryRange, TaskInstance, TodaySnapshot, WeekEntry, WeekSnapshot,
};
use anyhow::Result;
use chrono::Days;

impl Database {
    /// Materialize today and gather everything the dashboard shows.
    pub fn today_snapshot(&self) -> Result<TodaySnapshot> {
        let today = self.clock().today();
        let now = self.clock().timestamp();

        self.transact(|tx| {
            let (all_tasks, day_type) = materialize_internal(tx, today, &now)?;
            let key = format_date(today);
            let stats = get_stored_stats_internal(tx, &key)?
                .map(|stored| stored.stats)
                .ok_or_else(|| anyhow::anyhow!("stats row missing after materialize: {}", key))?;

            let (main_tasks, optional_tasks): (Vec<TaskInstance>, Vec<TaskInstance>) = all_tasks
                .iter()
                .cloned()
                .partition(|t| t.category == Category::Main);

            Ok(TodaySnapshot {
                date: key.clone(),
                weekday: weekday_index(today),
                day_type,
                main_tasks,
                optional_tasks,
                completed_tasks: completed_tasks_internal(tx, &key)?,
                all_tasks,
                stats,
                streak: read_streak_internal(tx, today)?,
                lifetime: get_lifetime_internal(tx)?,
                achievements: list_achievements_internal(tx)?,
            })
        })
    }

    /// Seven days ending today. Days without a stats row are materialized.
    ///
    /// `completed`/`total` count main tasks only.
    pub fn week_snapshot(&self) -> Result<WeekSnapshot> {
        let today = self.clock().today();
        let now = self.clock().timestamp();

        self.transact(|tx| {
            let mut week_data = Vec::with_capacity(7);
            for back in (0..7u64).rev() {
                let date = today
                    .checked_sub_days(Days::new(back))
                    .ok_or_else(|| anyhow::anyhow!("date out of range"))?;
                let key = format_date(date);

                let stats = match get_stored_stats_internal(tx, &key)? {
                    Some(stored) => stored.stats,
                    None => {
                        materialize_internal(tx, date, &now)?;
                        get_stored_stats_internal(tx, &key)?
                            .map(|stored| stored.stats)
                            .ok_or_else(|| anyhow::anyhow!("stats row missing: {}", key))?
                    }
                };

                week_data.push(WeekEntry {
                    date: key,
                    weekday: weekday_label(weekday_index(date)),
                    rate: stats.rate,
                    main_rate: stats.main_rate,
                    completed: stats.main_completed,
                    total: stats.main_total,
                    is_valid_checkin: stats.is_valid_checkin,
                    day_type: stats.day_type,
                });
            }

            Ok(WeekSnapshot {
                week_data,
                streak: read_streak_internal(tx, today)?,
            })
        })
    }

    /// Reconstruct one day.
    ///
    /// A past day that already has a stats row is returned as stored, so later
    /// template changes never rewrite it. Other days are materialized first.
    pub fn history(&self, date: &str) -> Result<HistoryDay> {
        let date = parse_date(date)?;
        let today = self.clock().today();
        let now = self.clock().timestamp();

        self.transact(|tx| {
            let key = format_date(date);
            let settled = if date < today {
                get_stored_stats_internal(tx, &key)?
            } else {
                None
            };

            let (tasks, day_type, stats) = match settled {
                Some(stored) => (
                    list_instances_internal(tx, &key)?,
                    stored.stats.day_type,
                    stored.stats,
                ),
                None => {
                    let (tasks, day_type) = materialize_internal(tx, date, &now)?;
                    let stats = get_stored_stats_internal(tx, &key)?
                        .map(|stored| stored.stats)
                        .ok_or_else(|| {
                            anyhow::anyhow!("stats row missing after materialize: {}", key)
                        })?;
                    (tasks, day_type, stats)
                }
            };

            Ok(HistoryDay {
                completed_tasks: completed_tasks_internal(tx, &key)?,
                date: key,
                day_type,
                tasks,
                stats,
            })
        })
    }

    /// Stored stats rows in `[start, end]`, newest first. Nothing is materialized.
    pub fn history_range(&self, start: &str, end: &str) -> Result<HistoryRange> {
        let start = format_date(parse_date(start)?);
        let end = format_date(parse_date(end)?);

        let history = self.with_conn(|conn| stats_in_range_internal(conn, &start, &end))?;
        Ok(HistoryRange {
            start_date: start,
            end_date: end,
            history,
        })
    }
}
