//! Core types for the daily task tracker.

use crate::error::TrackerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Task category. Only main tasks count toward a valid check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Main,
    Optional,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Main => "main",
            Category::Optional => "optional",
        }
    }
}

impl FromStr for Category {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "main" => Ok(Category::Main),
            "optional" => Ok(Category::Optional),
            other => Err(TrackerError::invalid_field(
                "category",
                format!("expected 'main' or 'optional', got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Days a template applies to.
///
/// `All` is kept distinct from a mask with every bit set so that the stored
/// form round-trips exactly (`all` vs `0,1,2,3,4,5,6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekdaySet {
    All,
    /// Bit `n` set means weekday `n` (0 = Monday).
    Days(u8),
}

impl WeekdaySet {
    pub fn from_days(days: impl IntoIterator<Item = u8>) -> Result<Self, TrackerError> {
        let mut mask = 0u8;
        for day in days {
            if day > 6 {
                return Err(TrackerError::invalid_field(
                    "weekdays",
                    format!("weekday index out of range 0..6: {}", day),
                ));
            }
            mask |= 1 << day;
        }
        if mask == 0 {
            return Err(TrackerError::invalid_field(
                "weekdays",
                "at least one weekday is required",
            ));
        }
        Ok(WeekdaySet::Days(mask))
    }

    pub fn contains(self, weekday: u8) -> bool {
        match self {
            WeekdaySet::All => weekday <= 6,
            WeekdaySet::Days(mask) => weekday <= 6 && mask & (1 << weekday) != 0,
        }
    }

    /// Indices in ascending order.
    pub fn days(self) -> Vec<u8> {
        (0..7).filter(|d| self.contains(*d)).collect()
    }
}

impl FromStr for WeekdaySet {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(WeekdaySet::All);
        }
        let days = s
            .split(',')
            .map(|part| {
                part.trim().parse::<u8>().map_err(|_| {
                    TrackerError::invalid_field(
                        "weekdays",
                        format!("expected 'all' or comma-separated 0..6, got '{}'", s),
                    )
                })
            })
            .collect::<Result<Vec<u8>, _>>()?;
        WeekdaySet::from_days(days)
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekdaySet::All => f.write_str("all"),
            WeekdaySet::Days(_) => {
                let parts: Vec<String> = self.days().iter().map(|d| d.to_string()).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Subject a day type counts toward in the lifetime ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Math,
    Cs,
    English,
}

/// Fixed label for each weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayType {
    Math,
    #[serde(rename = "CS")]
    Cs,
    English,
    EnglishDrill,
    Project,
    Flex,
}

impl DayType {
    /// Monday=Math .. Sunday=Flex.
    pub fn for_weekday(weekday: u8) -> Self {
        match weekday {
            0 | 3 => DayType::Math,
            1 => DayType::Cs,
            2 => DayType::English,
            4 => DayType::EnglishDrill,
            5 => DayType::Project,
            _ => DayType::Flex,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayType::Math => "Math",
            DayType::Cs => "CS",
            DayType::English => "English",
            DayType::EnglishDrill => "EnglishDrill",
            DayType::Project => "Project",
            DayType::Flex => "Flex",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Math" => Some(DayType::Math),
            "CS" => Some(DayType::Cs),
            "English" => Some(DayType::English),
            "EnglishDrill" => Some(DayType::EnglishDrill),
            "Project" => Some(DayType::Project),
            "Flex" => Some(DayType::Flex),
            _ => None,
        }
    }

    pub fn subject(self) -> Option<Subject> {
        match self {
            DayType::Math => Some(Subject::Math),
            DayType::Cs => Some(Subject::Cs),
            DayType::English | DayType::EnglishDrill => Some(Subject::English),
            DayType::Project | DayType::Flex => None,
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A recurring task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub weekdays: WeekdaySet,
    pub is_system: bool,
    pub created_at: String,
}

/// Validated input for creating or updating a template.
#[derive(Debug, Clone)]
pub struct TemplateInput {
    pub name: String,
    pub category: Category,
    pub weekdays: WeekdaySet,
}

impl TemplateInput {
    /// Normalize raw boundary values. Blank names are rejected.
    pub fn parse(name: &str, category: &str, weekdays: &str) -> Result<Self, TrackerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::invalid_field("name", "name must not be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            category: category.parse()?,
            weekdays: weekdays.parse()?,
        })
    }
}

/// A concrete per-date occurrence of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInstance {
    pub id: i64,
    pub date: String,
    pub name: String,
    pub category: Category,
    pub template_id: Option<i64>,
    pub completed: bool,
    pub completed_at: Option<String>,
}

/// Completed-task detail line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTask {
    pub name: String,
    pub category: Category,
    pub completed_at: Option<String>,
}

/// Aggregates for one date, recomputed from its instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: String,
    pub day_type: DayType,
    pub total: i64,
    pub completed: i64,
    pub rate: f64,
    pub main_total: i64,
    pub main_completed: i64,
    pub main_rate: f64,
    pub optional_total: i64,
    pub optional_completed: i64,
    pub is_valid_checkin: bool,
    pub is_perfect: bool,
}

/// Streak singleton as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakInfo {
    pub current: i64,
    pub max: i64,
    pub last_checkin_date: Option<String>,
}

/// Running ledger of completions and credited days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifetimeStats {
    pub total_tasks: i64,
    pub main_tasks: i64,
    pub optional_tasks: i64,
    pub study_days: i64,
    pub perfect_days: i64,
    pub math_days: i64,
    pub cs_days: i64,
    pub english_days: i64,
}

/// An achievement with its unlock state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub unlocked: bool,
    pub unlocked_at: Option<String>,
}

/// Everything the dashboard shows for today.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaySnapshot {
    pub date: String,
    pub weekday: u8,
    pub day_type: DayType,
    pub main_tasks: Vec<TaskInstance>,
    pub optional_tasks: Vec<TaskInstance>,
    pub all_tasks: Vec<TaskInstance>,
    pub completed_tasks: Vec<CompletedTask>,
    pub stats: DailyStats,
    pub streak: StreakInfo,
    pub lifetime: LifetimeStats,
    pub achievements: Vec<Achievement>,
}

/// Result of a completion toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub task_id: i64,
    pub completed: bool,
    /// `HH:MM` of the completion, when completed.
    pub completed_at: Option<String>,
    pub stats: DailyStats,
    pub new_achievements: Vec<Achievement>,
}

/// One day of the trailing week.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekEntry {
    pub date: String,
    pub weekday: &'static str,
    pub rate: f64,
    pub main_rate: f64,
    pub completed: i64,
    pub total: i64,
    pub is_valid_checkin: bool,
    pub day_type: DayType,
}

/// Trailing seven days, oldest first, with the streak.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSnapshot {
    pub week_data: Vec<WeekEntry>,
    pub streak: StreakInfo,
}

/// Stored stats rows between two dates, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRange {
    pub start_date: String,
    pub end_date: String,
    pub history: Vec<DailyStats>,
}

/// Single-day reconstruction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDay {
    pub date: String,
    pub day_type: DayType,
    pub tasks: Vec<TaskInstance>,
    pub completed_tasks: Vec<CompletedTask>,
    pub stats: DailyStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_normalizes() {
        assert_eq!("main".parse::<Category>().unwrap(), Category::Main);
        assert_eq!(" Optional ".parse::<Category>().unwrap(), Category::Optional);
        assert!("side".parse::<Category>().is_err());
    }

    #[test]
    fn test_weekday_set_no_substring_match() {
        let set: WeekdaySet = "1,3".parse().unwrap();
        assert!(set.contains(1));
        assert!(set.contains(3));
        assert!(!set.contains(0));
        assert!(!set.contains(6));
        // Out-of-range indices are rejected rather than matched as text.
        assert!("1,10".parse::<WeekdaySet>().is_err());
    }

    #[test]
    fn test_weekday_set_canonical_form() {
        let set: WeekdaySet = " 4, 0 ,2,2".parse().unwrap();
        assert_eq!(set.to_string(), "0,2,4");
        assert_eq!("ALL".parse::<WeekdaySet>().unwrap().to_string(), "all");

        let every: WeekdaySet = "0,1,2,3,4,5,6".parse().unwrap();
        assert_ne!(every, WeekdaySet::All);
        assert!((0..7).all(|d| every.contains(d)));
    }

    #[test]
    fn test_weekday_set_rejects_empty_and_junk() {
        assert!("".parse::<WeekdaySet>().is_err());
        assert!("mon".parse::<WeekdaySet>().is_err());
        assert!("1,,2".parse::<WeekdaySet>().is_err());
    }

    #[test]
    fn test_weekday_set_serde_as_string() {
        let json = serde_json::to_string(&WeekdaySet::Days(0b101)).unwrap();
        assert_eq!(json, "\"0,2\"");
        let back: WeekdaySet = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(back, WeekdaySet::All);
    }

    #[test]
    fn test_day_type_table() {
        let labels: Vec<&str> = (0..7).map(|d| DayType::for_weekday(d).label()).collect();
        assert_eq!(
            labels,
            vec!["Math", "CS", "English", "Math", "EnglishDrill", "Project", "Flex"]
        );
        assert_eq!(DayType::EnglishDrill.subject(), Some(Subject::English));
        assert_eq!(DayType::Flex.subject(), None);
        assert_eq!(serde_json::to_string(&DayType::Cs).unwrap(), "\"CS\"");
    }

    #[test]
    fn test_template_input_rejects_blank_name() {
        assert!(TemplateInput::parse("   ", "main", "all").is_err());
        let input = TemplateInput::parse(" Run ", "main", "0").unwrap();
        assert_eq!(input.name, "Run");
    }
}
