//! Full JSON dump of the tracker state.
//!
//! Each table is read with deterministic ordering so two dumps of the same
//! store are byte-identical apart from `exportTime`.

use super::Database;
use super::lifetime::{get_lifetime_internal, list_achievements_internal};
use super::stats::parse_stats_row;
use super::streak::get_streak_internal;
use super::tasks::parse_instance_row;
use super::templates::list_templates_internal;
use crate::types::{Achievement, DailyStats, LifetimeStats, StreakInfo, TaskInstance, TaskTemplate};
use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// Current export format version.
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub schema_version: u32,
    pub export_time: String,
    pub tasks: Vec<TaskInstance>,
    pub daily_stats: Vec<DailyStats>,
    pub streak: StreakInfo,
    pub lifetime: LifetimeStats,
    /// Unlocked achievements only.
    pub achievements: Vec<Achievement>,
    pub task_templates: Vec<TaskTemplate>,
}

fn export_tasks(conn: &Connection) -> Result<Vec<TaskInstance>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, name, category, template_id, completed, completed_at
         FROM tasks ORDER BY date, id",
    )?;
    let tasks = stmt
        .query_map([], parse_instance_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

fn export_daily_stats(conn: &Connection) -> Result<Vec<DailyStats>> {
    let mut stmt = conn.prepare("SELECT * FROM daily_stats ORDER BY date")?;
    let stats = stmt
        .query_map([], parse_stats_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(stats)
}

impl Database {
    /// Snapshot every table in one read.
    pub fn export_all(&self) -> Result<ExportBundle> {
        let export_time = self.clock().timestamp();
        self.with_conn(|conn| {
            Ok(ExportBundle {
                schema_version: EXPORT_SCHEMA_VERSION,
                export_time,
                tasks: export_tasks(conn)?,
                daily_stats: export_daily_stats(conn)?,
                streak: get_streak_internal(conn)?,
                lifetime: get_lifetime_internal(conn)?,
                achievements: list_achievements_internal(conn)?
                    .into_iter()
                    .filter(|a| a.unlocked)
                    .collect(),
                task_templates: list_templates_internal(conn, None)?,
            })
        })
    }
}
