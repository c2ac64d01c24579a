//! Lifetime ledger, per-day credits and one-shot achievements.

use super::Database;
use super::stats::get_stored_stats_internal;
use super::streak::read_streak_internal;
use crate::error::TrackerError;
use crate::types::{Achievement, Category, DailyStats, LifetimeStats, Subject};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use std::collections::HashMap;
use tracing::{debug, info};

/// Unlock condition for an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    TotalTasks(i64),
    MainTasks(i64),
    CurrentStreak(i64),
    PerfectDays(i64),
    SubjectDays(Subject, i64),
}

impl Rule {
    fn is_met(self, lifetime: &LifetimeStats, current_streak: i64) -> bool {
        match self {
            Rule::TotalTasks(n) => lifetime.total_tasks >= n,
            Rule::MainTasks(n) => lifetime.main_tasks >= n,
            Rule::CurrentStreak(n) => current_streak >= n,
            Rule::PerfectDays(n) => lifetime.perfect_days >= n,
            Rule::SubjectDays(Subject::Math, n) => lifetime.math_days >= n,
            Rule::SubjectDays(Subject::Cs, n) => lifetime.cs_days >= n,
            Rule::SubjectDays(Subject::English, n) => lifetime.english_days >= n,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rule: Rule,
}

pub const ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        id: "first_blood",
        name: "First Blood",
        description: "Complete your first task",
        icon: "🎯",
        rule: Rule::TotalTasks(1),
    },
    AchievementDef {
        id: "streak_3",
        name: "Warming Up",
        description: "Check in 3 days in a row",
        icon: "🔥",
        rule: Rule::CurrentStreak(3),
    },
    AchievementDef {
        id: "streak_7",
        name: "Full Week",
        description: "Check in 7 days in a row",
        icon: "⚡",
        rule: Rule::CurrentStreak(7),
    },
    AchievementDef {
        id: "streak_30",
        name: "Iron Will",
        description: "Check in 30 days in a row",
        icon: "🏆",
        rule: Rule::CurrentStreak(30),
    },
    AchievementDef {
        id: "perfect_day",
        name: "Perfect Day",
        description: "Finish every task of a day, optional ones included",
        icon: "⭐",
        rule: Rule::PerfectDays(1),
    },
    AchievementDef {
        id: "task_master",
        name: "Task Master",
        description: "Complete 100 tasks",
        icon: "💯",
        rule: Rule::TotalTasks(100),
    },
    AchievementDef {
        id: "main_master",
        name: "Main Line",
        description: "Complete 50 main tasks",
        icon: "🎖️",
        rule: Rule::MainTasks(50),
    },
    AchievementDef {
        id: "math_master",
        name: "Math Master",
        description: "Check in on 10 math days",
        icon: "📐",
        rule: Rule::SubjectDays(Subject::Math, 10),
    },
    AchievementDef {
        id: "cs_master",
        name: "CS Master",
        description: "Check in on 10 CS days",
        icon: "💻",
        rule: Rule::SubjectDays(Subject::Cs, 10),
    },
    AchievementDef {
        id: "english_master",
        name: "English Master",
        description: "Check in on 10 English days",
        icon: "📚",
        rule: Rule::SubjectDays(Subject::English, 10),
    },
];

pub(crate) fn get_lifetime_internal(conn: &Connection) -> Result<LifetimeStats> {
    let lifetime = conn.query_row(
        "SELECT total_tasks_completed, main_tasks_completed, optional_tasks_completed,
                total_study_days, total_perfect_days, math_days, cs_days, english_days
         FROM lifetime_stats WHERE id = 1",
        [],
        |row| {
            Ok(LifetimeStats {
                total_tasks: row.get(0)?,
                main_tasks: row.get(1)?,
                optional_tasks: row.get(2)?,
                study_days: row.get(3)?,
                perfect_days: row.get(4)?,
                math_days: row.get(5)?,
                cs_days: row.get(6)?,
                english_days: row.get(7)?,
            })
        },
    )?;
    Ok(lifetime)
}

fn check_delta(delta: i64) -> Result<()> {
    if delta != 1 && delta != -1 {
        return Err(TrackerError::invalid_field(
            "delta",
            format!("expected +1 or -1, got {}", delta),
        )
        .into());
    }
    Ok(())
}

/// Apply a completion transition to the total and category counters.
pub(crate) fn adjust_lifetime_internal(
    conn: &Connection,
    category: Category,
    delta: i64,
    updated_at: &str,
) -> Result<()> {
    check_delta(delta)?;

    let column = match category {
        Category::Main => "main_tasks_completed",
        Category::Optional => "optional_tasks_completed",
    };
    conn.execute(
        &format!(
            "UPDATE lifetime_stats SET
                total_tasks_completed = MAX(0, total_tasks_completed + ?1),
                {column} = MAX(0, {column} + ?1),
                updated_at = ?2
             WHERE id = 1"
        ),
        params![delta, updated_at],
    )?;
    Ok(())
}

/// Move the day counters by `delta`, clamped at 0.
fn adjust_day_counters(
    conn: &Connection,
    columns: &[&str],
    delta: i64,
    updated_at: &str,
) -> Result<()> {
    let sets: Vec<String> = columns
        .iter()
        .map(|c| format!("{c} = MAX(0, {c} + ?1)"))
        .collect();
    conn.execute(
        &format!(
            "UPDATE lifetime_stats SET {}, updated_at = ?2 WHERE id = 1",
            sets.join(", ")
        ),
        params![delta, updated_at],
    )?;
    Ok(())
}

fn subject_column(subject: Subject) -> &'static str {
    match subject {
        Subject::Math => "math_days",
        Subject::Cs => "cs_days",
        Subject::English => "english_days",
    }
}

/// Sync the study-day and perfect-day counters with the date's current stats.
///
/// Each date is credited at most once per counter; a day that stops
/// qualifying gives its credit back.
pub(crate) fn credit_day_internal(
    conn: &Connection,
    stats: &DailyStats,
    updated_at: &str,
) -> Result<()> {
    let Some(stored) = get_stored_stats_internal(conn, &stats.date)? else {
        return Ok(());
    };

    if stats.is_valid_checkin != stored.credited_checkin {
        let delta = if stats.is_valid_checkin { 1 } else { -1 };
        let mut columns = vec!["total_study_days"];
        if let Some(subject) = stats.day_type.subject() {
            columns.push(subject_column(subject));
        }
        adjust_day_counters(conn, &columns, delta, updated_at)?;
        conn.execute(
            "UPDATE daily_stats SET credited_checkin = ?1 WHERE date = ?2",
            params![stats.is_valid_checkin as i64, stats.date],
        )?;
        debug!(date = %stats.date, delta, "Study day credit changed");
    }

    if stats.is_perfect != stored.credited_perfect {
        let delta = if stats.is_perfect { 1 } else { -1 };
        adjust_day_counters(conn, &["total_perfect_days"], delta, updated_at)?;
        conn.execute(
            "UPDATE daily_stats SET credited_perfect = ?1 WHERE date = ?2",
            params![stats.is_perfect as i64, stats.date],
        )?;
        debug!(date = %stats.date, delta, "Perfect day credit changed");
    }

    Ok(())
}

fn unlocked_map(conn: &Connection) -> Result<HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT achievement_id, unlocked_at FROM achievements")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<HashMap<String, String>>>()?;
    Ok(rows)
}

fn to_achievement(def: &AchievementDef, unlocked_at: Option<String>) -> Achievement {
    Achievement {
        id: def.id.to_string(),
        name: def.name.to_string(),
        description: def.description.to_string(),
        icon: def.icon.to_string(),
        unlocked: unlocked_at.is_some(),
        unlocked_at,
    }
}

/// Unlock every achievement whose rule now holds. Returns only new unlocks.
///
/// Streak rules see the streak as of `today`, so a lapsed run unlocks nothing.
pub(crate) fn check_achievements_internal(
    conn: &Connection,
    today: NaiveDate,
    unlocked_at: &str,
) -> Result<Vec<Achievement>> {
    let lifetime = get_lifetime_internal(conn)?;
    let streak = read_streak_internal(conn, today)?;
    let unlocked = unlocked_map(conn)?;

    let mut fresh = Vec::new();
    for def in ACHIEVEMENTS {
        if unlocked.contains_key(def.id) || !def.rule.is_met(&lifetime, streak.current) {
            continue;
        }
        conn.execute(
            "INSERT OR IGNORE INTO achievements
                (achievement_id, name, description, icon, unlocked_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![def.id, def.name, def.description, def.icon, unlocked_at],
        )?;
        info!(achievement = def.id, "Achievement unlocked");
        fresh.push(to_achievement(def, Some(unlocked_at.to_string())));
    }

    Ok(fresh)
}

/// Full catalogue in fixed order with unlock state.
pub(crate) fn list_achievements_internal(conn: &Connection) -> Result<Vec<Achievement>> {
    let mut unlocked = unlocked_map(conn)?;
    Ok(ACHIEVEMENTS
        .iter()
        .map(|def| to_achievement(def, unlocked.remove(def.id)))
        .collect())
}

impl Database {
    pub fn get_lifetime(&self) -> Result<LifetimeStats> {
        self.with_conn(get_lifetime_internal)
    }

    /// Apply a +1/-1 completion delta for `category`.
    pub fn adjust_lifetime(&self, category: Category, delta: i64) -> Result<LifetimeStats> {
        let now = self.clock().timestamp();
        self.transact(|tx| {
            adjust_lifetime_internal(tx, category, delta, &now)?;
            get_lifetime_internal(tx)
        })
    }

    /// Unlock any newly earned achievements.
    pub fn check_achievements(&self) -> Result<Vec<Achievement>> {
        let today = self.clock().today();
        let now = self.clock().timestamp();
        self.transact(|tx| check_achievements_internal(tx, today, &now))
    }

    pub fn list_achievements(&self) -> Result<Vec<Achievement>> {
        self.with_conn(list_achievements_internal)
    }
}
