//! Template store: recurring task definitions and their admin cascades.

use super::Database;
use super::stats::recompute_stats_internal;
use crate::clock::parse_date;
use crate::error::TrackerError;
use crate::types::{Category, TaskTemplate, TemplateInput, WeekdaySet};
use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use tracing::info;

/// System templates seeded on first boot.
pub const DEFAULT_TEMPLATES: &[(&str, Category, &str)] = &[
    // Monday, math day
    (
        "Multivariable calculus (gradients, extrema, multiple integrals)",
        Category::Main,
        "0",
    ),
    ("OGCP recording", Category::Optional, "0,1,2,3,4"),
    ("Godot tinkering", Category::Optional, "0,1,3,5,6"),
    ("Grammar drills", Category::Optional, "0,1,3,4"),
    ("Vocabulary", Category::Optional, "0,1,2,3,4"),
    // Tuesday, CS day
    ("Data structures (trees, graphs, C)", Category::Main, "1"),
    // Wednesday, English day
    (
        "Reading logic (paragraph structure, long sentences)",
        Category::Main,
        "2",
    ),
    ("Grammar gaps (subjunctive mood)", Category::Optional, "2"),
    // Thursday, math day
    (
        "Calculus practice (computation, applied problems)",
        Category::Main,
        "3",
    ),
    // Friday, English drill
    ("Past exam paper (2010 onward)", Category::Main, "4"),
    // Saturday, project day
    ("Mistake review (no new material)", Category::Main, "5"),
    ("OpenGuitar data cleaning", Category::Optional, "5"),
    ("Hosted coding session", Category::Optional, "5"),
    // Sunday, flex day
    ("Studio night (not mandatory)", Category::Main, "6"),
    ("Rest, family, outings", Category::Optional, "6"),
];

pub fn parse_template_row(row: &Row) -> rusqlite::Result<TaskTemplate> {
    let category: String = row.get("category")?;
    let weekdays: String = row.get("weekdays")?;
    let is_system: i64 = row.get("is_system")?;

    Ok(TaskTemplate {
        id: row.get("id")?,
        name: row.get("name")?,
        category: category
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        weekdays: weekdays
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        is_system: is_system != 0,
        created_at: row.get("created_at")?,
    })
}

/// Templates ordered by id, optionally only those applying to `weekday`.
pub(crate) fn list_templates_internal(
    conn: &Connection,
    weekday: Option<u8>,
) -> Result<Vec<TaskTemplate>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, weekdays, is_system, created_at
         FROM task_templates ORDER BY id",
    )?;
    let templates = stmt
        .query_map([], parse_template_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(match weekday {
        Some(day) => templates
            .into_iter()
            .filter(|t| t.weekdays.contains(day))
            .collect(),
        None => templates,
    })
}

fn get_template_internal(conn: &Connection, template_id: i64) -> Result<Option<TaskTemplate>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, weekdays, is_system, created_at
         FROM task_templates WHERE id = ?1",
    )?;

    match stmt.query_row(params![template_id], parse_template_row) {
        Ok(template) => Ok(Some(template)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Id of the template holding `name`, if any.
fn find_template_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
    match conn.query_row(
        "SELECT id FROM task_templates WHERE name = ?1",
        params![name],
        |row| row.get(0),
    ) {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn insert_template(
    conn: &Connection,
    name: &str,
    category: Category,
    weekdays: WeekdaySet,
    is_system: bool,
    created_at: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO task_templates (name, category, weekdays, is_system, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            name,
            category.as_str(),
            weekdays.to_string(),
            is_system as i64,
            created_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Dates from `today` on that hold incomplete instances of a template.
fn pending_instance_dates(conn: &Connection, template_id: i64, today: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT date FROM tasks
         WHERE template_id = ?1 AND date >= ?2 AND completed = 0
         ORDER BY date",
    )?;
    let dates = stmt
        .query_map(params![template_id, today], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(dates)
}

/// Recompute stats rows that already exist for the given dates.
fn refresh_existing_stats(conn: &Connection, dates: &[String], updated_at: &str) -> Result<()> {
    for date in dates {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM daily_stats WHERE date = ?1)",
            params![date],
            |row| row.get(0),
        )?;
        if exists {
            recompute_stats_internal(conn, parse_date(date)?, updated_at)?;
        }
    }
    Ok(())
}

impl Database {
    /// List templates; with a weekday, only those applying to it.
    pub fn list_templates(&self, weekday: Option<u8>) -> Result<Vec<TaskTemplate>> {
        self.with_conn(|conn| list_templates_internal(conn, weekday))
    }

    pub fn get_template(&self, template_id: i64) -> Result<Option<TaskTemplate>> {
        self.with_conn(|conn| get_template_internal(conn, template_id))
    }

    /// Create a user-defined template. Fails with `DuplicateName` before writing.
    pub fn create_template(&self, input: &TemplateInput) -> Result<TaskTemplate> {
        let created_at = self.clock().timestamp();
        let template = self.transact(|tx| {
            if find_template_by_name(tx, &input.name)?.is_some() {
                return Err(TrackerError::DuplicateName(input.name.clone()).into());
            }
            let id = insert_template(
                tx,
                &input.name,
                input.category,
                input.weekdays,
                false,
                &created_at,
            )?;
            Ok(TaskTemplate {
                id,
                name: input.name.clone(),
                category: input.category,
                weekdays: input.weekdays,
                is_system: false,
                created_at: created_at.clone(),
            })
        })?;

        info!(template_id = template.id, name = %template.name, "Template created");
        Ok(template)
    }

    /// Rename, recategorize or reschedule a template.
    ///
    /// Incomplete instances dated today or later follow the new name and
    /// category. Completed and past instances keep what was shown that day.
    pub fn update_template(&self, template_id: i64, input: &TemplateInput) -> Result<TaskTemplate> {
        let today = self.clock().today_key();
        let now = self.clock().timestamp();

        let template = self.transact(|tx| {
            let existing = get_template_internal(tx, template_id)?
                .ok_or_else(|| TrackerError::template_not_found(template_id))?;

            if let Some(other) = find_template_by_name(tx, &input.name)?
                && other != template_id
            {
                return Err(TrackerError::DuplicateName(input.name.clone()).into());
            }

            tx.execute(
                "UPDATE task_templates SET name = ?1, category = ?2, weekdays = ?3 WHERE id = ?4",
                params![
                    input.name,
                    input.category.as_str(),
                    input.weekdays.to_string(),
                    template_id
                ],
            )?;

            let affected = pending_instance_dates(tx, template_id, &today)?;

            // Rows whose new name would collide on their date keep the old one.
            tx.execute(
                "UPDATE OR IGNORE tasks SET name = ?1, category = ?2
                 WHERE template_id = ?3 AND date >= ?4 AND completed = 0",
                params![input.name, input.category.as_str(), template_id, today],
            )?;

            refresh_existing_stats(tx, &affected, &now)?;

            Ok(TaskTemplate {
                id: template_id,
                name: input.name.clone(),
                category: input.category,
                weekdays: input.weekdays,
                is_system: existing.is_system,
                created_at: existing.created_at,
            })
        })?;

        info!(template_id, name = %template.name, "Template updated");
        Ok(template)
    }

    /// Delete a template. Returns how many pending instances were removed.
    ///
    /// Only incomplete instances dated today or later go away; everything
    /// else stays as history with a dangling template id.
    pub fn delete_template(&self, template_id: i64) -> Result<usize> {
        let today = self.clock().today_key();
        let now = self.clock().timestamp();

        let removed = self.transact(|tx| {
            if get_template_internal(tx, template_id)?.is_none() {
                return Err(TrackerError::template_not_found(template_id).into());
            }

            let affected = pending_instance_dates(tx, template_id, &today)?;
            let removed = tx.execute(
                "DELETE FROM tasks WHERE template_id = ?1 AND date >= ?2 AND completed = 0",
                params![template_id, today],
            )?;
            tx.execute(
                "DELETE FROM task_templates WHERE id = ?1",
                params![template_id],
            )?;

            refresh_existing_stats(tx, &affected, &now)?;
            Ok(removed)
        })?;

        info!(template_id, removed, "Template deleted");
        Ok(removed)
    }

    /// Insert the system templates when the store has none. Returns the count inserted.
    pub fn seed_default_templates(&self) -> Result<usize> {
        let created_at = self.clock().timestamp();
        let seeded = self.transact(|tx| {
            let count: i64 =
                tx.query_row("SELECT COUNT(*) FROM task_templates", [], |row| row.get(0))?;
            if count > 0 {
                return Ok(0);
            }
            for (name, category, weekdays) in DEFAULT_TEMPLATES {
                insert_template(tx, name, *category, weekdays.parse()?, true, &created_at)?;
            }
            Ok(DEFAULT_TEMPLATES.len())
        })?;

        if seeded > 0 {
            info!(count = seeded, "Seeded default task templates");
        }
        Ok(seeded)
    }
}
