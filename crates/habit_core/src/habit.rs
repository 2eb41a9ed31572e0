use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{HabitError, Result};
use crate::progress::{same_day, Granularity};

/// Longest habit name accepted at entry, in characters.
pub const NAME_MAX_CHARS: usize = 12;
/// Largest goal frequency the entry form offers.
pub const GOAL_MAX: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Timescale {
    Daily,
    Weekly,
    Monthly,
    /// A persisted value outside the known set, kept verbatim so a save writes it back.
    /// Counts and percentages fall back to zero.
    Unrecognized(String),
}

impl Timescale {
    pub fn granularity(&self) -> Option<Granularity> {
        match self {
            Timescale::Daily => Some(Granularity::Day),
            Timescale::Weekly => Some(Granularity::Week),
            Timescale::Monthly => Some(Granularity::Month),
            Timescale::Unrecognized(_) => None,
        }
    }

    /// Singular noun for one unit of the timescale ("day", "week", "month").
    pub fn unit_noun(&self) -> &'static str {
        match self {
            Timescale::Daily => "day",
            Timescale::Weekly => "week",
            Timescale::Monthly => "month",
            Timescale::Unrecognized(_) => "period",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Timescale::Daily => "Daily",
            Timescale::Weekly => "Weekly",
            Timescale::Monthly => "Monthly",
            Timescale::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for Timescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timescale {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(Timescale::Daily),
            "weekly" | "week" | "w" => Ok(Timescale::Weekly),
            "monthly" | "month" | "m" => Ok(Timescale::Monthly),
            _ => Err(HabitError::UnknownTimescale(s.to_string())),
        }
    }
}

impl Serialize for Timescale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Timescale {
    /// Never fails: anything that is not a known name loads as `Unrecognized`.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let timescale = match value {
            serde_json::Value::String(raw) => match raw.parse() {
                Ok(known) => known,
                Err(_) => Timescale::Unrecognized(raw),
            },
            other => Timescale::Unrecognized(other.to_string()),
        };
        Ok(timescale)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Completion {
    pub id: Uuid,
    pub date: DateTime<Utc>,
}

impl Completion {
    fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: now.with_timezone(&Utc),
        }
    }
}

/// Result of an undo request. Ineligible requests are outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Performed(Completion),
    AlreadyUsedToday,
    NothingToUndo,
}

impl UndoOutcome {
    pub fn is_performed(&self) -> bool {
        matches!(self, UndoOutcome::Performed(_))
    }
}

/// A tracked habit. Completions are owned by the habit, so dropping it drops them too.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_good: bool,
    pub goal_frequency: u32,
    pub timescale: Timescale,
    #[serde(default)]
    completions: Vec<Completion>,
    #[serde(default)]
    last_undo: Option<DateTime<Utc>>,
}

impl Habit {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    pub fn last_undo(&self) -> Option<DateTime<Utc>> {
        self.last_undo
    }

    /// Whether the once-per-day undo has already been spent on `now`'s calendar day.
    pub fn undo_used<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.last_undo
            .as_ref()
            .map(|undone| same_day(undone, now))
            .unwrap_or(false)
    }

    pub fn has_completion_on_day<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.completions
            .iter()
            .any(|completion| same_day(&completion.date, now))
    }

    pub fn can_undo<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        !self.undo_used(now) && self.has_completion_on_day(now)
    }

    pub fn record_completion<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> &Completion {
        self.completions.push(Completion::at(now));
        &self.completions[self.completions.len() - 1]
    }

    /// Removes the latest completion dated on `now`'s calendar day, at most once per day.
    pub fn undo_last_completion<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> UndoOutcome {
        if self.undo_used(now) {
            return UndoOutcome::AlreadyUsedToday;
        }
        let Some(idx) = self
            .completions
            .iter()
            .rposition(|completion| same_day(&completion.date, now))
        else {
            tracing::warn!(habit = %self.id, name = %self.name, "no completion today to undo");
            return UndoOutcome::NothingToUndo;
        };
        let removed = self.completions.remove(idx);
        self.last_undo = Some(now.with_timezone(&Utc));
        UndoOutcome::Performed(removed)
    }
}

/// User-entered fields for a new habit, validated by [`HabitDraft::into_habit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitDraft {
    pub name: String,
    pub description: String,
    pub is_good: bool,
    pub goal_frequency: u32,
    pub timescale: Timescale,
}

impl Default for HabitDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            is_good: true,
            goal_frequency: 0,
            timescale: Timescale::Daily,
        }
    }
}

impl HabitDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn good(mut self, is_good: bool) -> Self {
        self.is_good = is_good;
        self
    }

    pub fn goal(mut self, goal_frequency: u32, timescale: Timescale) -> Self {
        self.goal_frequency = goal_frequency;
        self.timescale = timescale;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let len = self.name.trim().chars().count();
        if len == 0 || len > NAME_MAX_CHARS {
            return Err(HabitError::InvalidName {
                len,
                max: NAME_MAX_CHARS,
            });
        }
        if self.goal_frequency > GOAL_MAX {
            return Err(HabitError::InvalidGoal {
                value: self.goal_frequency,
                max: GOAL_MAX,
            });
        }
        if let Timescale::Unrecognized(raw) = &self.timescale {
            return Err(HabitError::UnknownTimescale(raw.clone()));
        }
        Ok(())
    }

    pub fn into_habit(self) -> Result<Habit> {
        self.validate()?;
        let description = self.description.trim();
        Ok(Habit {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            is_good: self.is_good,
            goal_frequency: self.goal_frequency,
            timescale: self.timescale,
            completions: Vec::new(),
            last_undo: None,
        })
    }
}
