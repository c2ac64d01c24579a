//! End-to-end tracker scenarios over several simulated days.

use ops_dashboard::clock::{Clock, parse_date};
use ops_dashboard::db::Database;
use ops_dashboard::types::{Category, TemplateInput};

fn setup_db(civil_now: &str) -> (Database, Clock) {
    let clock = Clock::pinned_at(civil_now).expect("Failed to pin clock");
    let db = Database::open_in_memory()
        .expect("Failed to create in-memory database")
        .with_clock(clock.clone());
    (db, clock)
}

fn template(db: &Database, name: &str, category: &str, weekdays: &str) -> i64 {
    let input = TemplateInput::parse(name, category, weekdays).unwrap();
    db.create_template(&input).unwrap().id
}

fn task_id_today(db: &Database, name: &str) -> i64 {
    db.today_snapshot()
        .unwrap()
        .all_tasks
        .into_iter()
        .find(|t| t.name == name)
        .map(|t| t.id)
        .unwrap_or_else(|| panic!("no task named {} today", name))
}

#[test]
fn single_main_task_monday() {
    let (db, clock) = setup_db("2026-10-12 07:30:00");
    template(&db, "Run", "main", "0");

    let (tasks, _) = db.materialize(parse_date("2026-10-12").unwrap()).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].category, Category::Main);
    assert!(!tasks[0].completed);

    let outcome = db.toggle_task(tasks[0].id, true).unwrap();
    assert!(outcome.stats.is_valid_checkin);
    assert_eq!(outcome.stats.main_rate, 100.0);
    assert_eq!(outcome.completed_at.as_deref(), Some("07:30"));

    // Tuesday has nothing to do.
    clock.advance_days(1);
    assert!(db.today_snapshot().unwrap().all_tasks.is_empty());
}

#[test]
fn complete_then_undo_restores_lifetime() {
    let (db, _) = setup_db("2026-10-12 09:00:00");
    template(&db, "Run", "main", "all");
    let id = task_id_today(&db, "Run");

    let before = db.get_lifetime().unwrap();
    db.toggle_task(id, true).unwrap();
    let streak_after_complete = db.get_streak().unwrap();
    db.toggle_task(id, false).unwrap();

    let after = db.get_lifetime().unwrap();
    assert_eq!(after.total_tasks, before.total_tasks);
    assert_eq!(after.main_tasks, before.main_tasks);
    assert_eq!(after.study_days, before.study_days);

    // Undo does not roll the streak back.
    assert_eq!(db.get_streak().unwrap(), streak_after_complete);
}

#[test]
fn deleting_template_keeps_yesterday() {
    let (db, clock) = setup_db("2026-10-12 09:00:00");
    let run = template(&db, "Run", "main", "all");
    let yesterday_id = task_id_today(&db, "Run");
    db.toggle_task(yesterday_id, true).unwrap();
    let yesterday = clock.today();

    clock.advance_days(1);
    let today_id = task_id_today(&db, "Run");
    db.history("2026-10-14").unwrap();
    let yesterday_stats = db.get_daily_stats(yesterday).unwrap().unwrap();

    let removed = db.delete_template(run).unwrap();
    assert_eq!(removed, 2);

    let kept = db.get_task(yesterday_id).unwrap().unwrap();
    assert!(kept.completed);
    assert_eq!(kept.name, "Run");
    assert_eq!(db.get_daily_stats(yesterday).unwrap().unwrap(), yesterday_stats);

    assert!(db.get_task(today_id).unwrap().is_none());
    let today = db.get_daily_stats(clock.today()).unwrap().unwrap();
    assert_eq!(today.total, 0);
    assert!(db.history("2026-10-14").unwrap().tasks.is_empty());
}

#[test]
fn three_day_streak_unlocks_once() {
    let (db, clock) = setup_db("2026-10-12 09:00:00");
    template(&db, "Run", "main", "all");

    let mut streak_unlocks = 0;
    for _ in 0..3 {
        let id = task_id_today(&db, "Run");
        let outcome = db.toggle_task(id, true).unwrap();
        assert!(outcome.stats.is_valid_checkin);
        streak_unlocks += outcome
            .new_achievements
            .iter()
            .filter(|a| a.id == "streak_3")
            .count();
        clock.advance_days(1);
    }
    clock.advance_days(-1);

    assert_eq!(db.get_streak().unwrap().current, 3);
    assert_eq!(streak_unlocks, 1);

    // Flipping the last day off and on again does not re-announce it.
    let id = task_id_today(&db, "Run");
    db.toggle_task(id, false).unwrap();
    let outcome = db.toggle_task(id, true).unwrap();
    assert!(outcome.new_achievements.is_empty());

    let streak_3 = db
        .list_achievements()
        .unwrap()
        .into_iter()
        .find(|a| a.id == "streak_3")
        .unwrap();
    assert!(streak_3.unlocked);
    assert_eq!(streak_3.unlocked_at.as_deref(), Some("2026-10-14 09:00:00"));
}

#[test]
fn subject_mastery_over_weeks() {
    let (db, clock) = setup_db("2026-10-12 09:00:00");
    template(&db, "Study", "main", "all");

    // Ten Mondays, one week apart.
    let mut unlocked = Vec::new();
    for _ in 0..10 {
        let id = task_id_today(&db, "Study");
        let outcome = db.toggle_task(id, true).unwrap();
        unlocked.extend(outcome.new_achievements.into_iter().map(|a| a.id));
        clock.advance_days(7);
    }

    let lifetime = db.get_lifetime().unwrap();
    assert_eq!(lifetime.math_days, 10);
    assert_eq!(lifetime.study_days, 10);
    assert_eq!(lifetime.cs_days, 0);
    assert!(unlocked.contains(&"math_master".to_string()));
    assert!(!unlocked.contains(&"streak_3".to_string()));
    assert_eq!(db.get_streak().unwrap().max, 1);
}
