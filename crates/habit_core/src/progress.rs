use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::HabitError;
use crate::habit::{Completion, Habit, Timescale};

/// Calendar bucket used when counting completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    /// Column of `weekday` in a week that begins on `self` (0-based).
    pub fn days_from_start(self, weekday: Weekday) -> u32 {
        match self {
            WeekStart::Sunday => weekday.num_days_from_sunday(),
            WeekStart::Monday => weekday.num_days_from_monday(),
        }
    }
}

impl FromStr for WeekStart {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            _ => Err(HabitError::UnknownWeekStart(s.to_string())),
        }
    }
}

/// Wall-calendar date of `instant` in `tz`.
pub fn local_date<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// True when `instant` falls on the same calendar day as `now`, in `now`'s time zone.
pub fn same_day<Tz: TimeZone>(instant: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    local_date(instant, &now.timezone()) == now.date_naive()
}

pub fn is_plural(count: usize) -> bool {
    count != 1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Qualifier {
    At,
    Towards,
    AtOrBelow,
    Over,
}

impl Qualifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::At => "At",
            Qualifier::Towards => "Towards",
            Qualifier::AtOrBelow => "At or below",
            Qualifier::Over => "Over",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage toward a goal plus the word that frames it.
///
/// Negative percentages mean the goal is violated: `-100` for any completion against a
/// zero goal, and `-(overage)` for a bad habit past its limit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    pub percent: f64,
    pub qualifier: Qualifier,
}

impl Progress {
    pub fn is_violated(&self) -> bool {
        self.percent < 0.0
    }
}

/// Scores a window count against a goal. `count` is `None` for an unrecognized timescale.
pub fn score(is_good: bool, goal_frequency: u32, count: Option<usize>) -> Progress {
    let Some(count) = count else {
        let qualifier = if goal_frequency == 0 {
            Qualifier::At
        } else {
            Qualifier::Towards
        };
        return Progress {
            percent: 0.0,
            qualifier,
        };
    };

    if goal_frequency == 0 {
        let percent = if count == 0 { 100.0 } else { -100.0 };
        return Progress {
            percent,
            qualifier: Qualifier::At,
        };
    }

    let goal = f64::from(goal_frequency);
    let count = count as f64;
    if is_good {
        let percent = count * 100.0 / goal;
        let qualifier = if percent >= 100.0 {
            Qualifier::At
        } else {
            Qualifier::Towards
        };
        return Progress { percent, qualifier };
    }

    let inverted = (goal - count) * 100.0 / goal;
    if inverted >= 0.0 {
        Progress {
            percent: 100.0,
            qualifier: Qualifier::AtOrBelow,
        }
    } else {
        Progress {
            percent: inverted,
            qualifier: Qualifier::Over,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowCounts {
    pub daily: usize,
    pub weekly: usize,
    pub monthly: usize,
}

impl WindowCounts {
    pub fn get(&self, granularity: Granularity) -> usize {
        match granularity {
            Granularity::Day => self.daily,
            Granularity::Week => self.weekly,
            Granularity::Month => self.monthly,
        }
    }

    pub fn count_for(&self, timescale: &Timescale) -> Option<usize> {
        timescale.granularity().map(|granularity| self.get(granularity))
    }
}

/// Everything a habit screen shows for one `(habit, now)` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HabitInsights {
    pub counts: WindowCounts,
    pub progress: Progress,
    pub goal_met: bool,
    pub can_undo: bool,
}

impl HabitInsights {
    pub fn message(&self) -> &'static str {
        if self.goal_met {
            "You did it!"
        } else {
            "You're on your way"
        }
    }
}

/// Derives counts and progress from a habit's completions. Holds no habit state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressEngine {
    week_start: WeekStart,
}

impl ProgressEngine {
    pub fn new(week_start: WeekStart) -> Self {
        Self { week_start }
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    /// First calendar date of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate, granularity: Granularity) -> NaiveDate {
        match granularity {
            Granularity::Day => date,
            Granularity::Week => {
                let back = self.week_start.days_from_start(date.weekday());
                date.checked_sub_signed(Duration::days(i64::from(back)))
                    .unwrap_or(NaiveDate::MIN)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    pub fn same_bucket<Tz: TimeZone>(
        &self,
        instant: &DateTime<Utc>,
        now: &DateTime<Tz>,
        granularity: Granularity,
    ) -> bool {
        let date = local_date(instant, &now.timezone());
        self.bucket_start(date, granularity) == self.bucket_start(now.date_naive(), granularity)
    }

    pub fn count_in_window<Tz: TimeZone>(
        &self,
        completions: &[Completion],
        now: &DateTime<Tz>,
        granularity: Granularity,
    ) -> usize {
        completions
            .iter()
            .filter(|completion| self.same_bucket(&completion.date, now, granularity))
            .count()
    }

    pub fn window_counts<Tz: TimeZone>(&self, habit: &Habit, now: &DateTime<Tz>) -> WindowCounts {
        let tz = now.timezone();
        let today = now.date_naive();
        let week = self.bucket_start(today, Granularity::Week);
        let month = self.bucket_start(today, Granularity::Month);

        let mut counts = WindowCounts::default();
        for completion in habit.completions() {
            let date = local_date(&completion.date, &tz);
            if date == today {
                counts.daily += 1;
            }
            if self.bucket_start(date, Granularity::Week) == week {
                counts.weekly += 1;
            }
            if self.bucket_start(date, Granularity::Month) == month {
                counts.monthly += 1;
            }
        }
        counts
    }

    /// Window count for the habit's own timescale, `None` when the timescale is unrecognized.
    pub fn timescale_count<Tz: TimeZone>(&self, habit: &Habit, now: &DateTime<Tz>) -> Option<usize> {
        habit
            .timescale
            .granularity()
            .map(|granularity| self.count_in_window(habit.completions(), now, granularity))
    }

    pub fn progress_percent<Tz: TimeZone>(&self, habit: &Habit, now: &DateTime<Tz>) -> Progress {
        score(
            habit.is_good,
            habit.goal_frequency,
            self.timescale_count(habit, now),
        )
    }

    pub fn goal_met<Tz: TimeZone>(&self, habit: &Habit, now: &DateTime<Tz>) -> bool {
        goal_met(
            habit.is_good,
            habit.goal_frequency,
            self.timescale_count(habit, now),
        )
    }

    pub fn insights<Tz: TimeZone>(&self, habit: &Habit, now: &DateTime<Tz>) -> HabitInsights {
        let counts = self.window_counts(habit, now);
        let count = counts.count_for(&habit.timescale);
        HabitInsights {
            counts,
            progress: score(habit.is_good, habit.goal_frequency, count),
            goal_met: goal_met(habit.is_good, habit.goal_frequency, count),
            can_undo: habit.can_undo(now),
        }
    }
}

fn goal_met(is_good: bool, goal_frequency: u32, count: Option<usize>) -> bool {
    let goal = goal_frequency as usize;
    match count {
        None => goal == 0,
        Some(count) if goal == 0 => count == 0,
        Some(count) if is_good => count >= goal,
        Some(count) => count <= goal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitDraft;
    use chrono::FixedOffset;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn habit_with(
        is_good: bool,
        goal: u32,
        timescale: Timescale,
        completions: &[DateTime<Utc>],
    ) -> Habit {
        let mut habit = HabitDraft::new("Test")
            .good(is_good)
            .goal(goal, timescale)
            .into_habit()
            .unwrap();
        for when in completions {
            habit.record_completion(when);
        }
        habit
    }

    #[test]
    fn daily_window_excludes_adjacent_days_within_24_hours() {
        let engine = ProgressEngine::default();
        let now = at(2025, 6, 11, 1);
        let completions = [at(2025, 6, 10, 23), at(2025, 6, 11, 0), at(2025, 6, 12, 0)];
        let habit = habit_with(true, 1, Timescale::Daily, &completions);
        assert_eq!(
            engine.count_in_window(habit.completions(), &now, Granularity::Day),
            1
        );
    }

    #[test]
    fn weekly_window_follows_week_start() {
        // 2025-06-15 is a Sunday.
        let now = at(2025, 6, 16, 12);
        let completions = [at(2025, 6, 14, 9), at(2025, 6, 15, 9), at(2025, 6, 16, 9)];
        let habit = habit_with(true, 1, Timescale::Weekly, &completions);

        let sunday = ProgressEngine::new(WeekStart::Sunday);
        assert_eq!(
            sunday.count_in_window(habit.completions(), &now, Granularity::Week),
            2
        );
        let monday = ProgressEngine::new(WeekStart::Monday);
        assert_eq!(
            monday.count_in_window(habit.completions(), &now, Granularity::Week),
            1
        );
    }

    #[test]
    fn weekly_window_spans_year_boundary() {
        // Week of Sunday 2024-12-29 through Saturday 2025-01-04.
        let now = at(2025, 1, 2, 12);
        let completions = [at(2024, 12, 28, 9), at(2024, 12, 30, 9), at(2025, 1, 1, 9)];
        let habit = habit_with(true, 1, Timescale::Weekly, &completions);
        let engine = ProgressEngine::default();
        assert_eq!(
            engine.count_in_window(habit.completions(), &now, Granularity::Week),
            2
        );
    }

    #[test]
    fn monthly_window_uses_calendar_month() {
        let now = at(2025, 3, 1, 8);
        let completions = [at(2025, 2, 28, 22), at(2025, 3, 1, 7), at(2024, 3, 1, 7)];
        let habit = habit_with(true, 1, Timescale::Monthly, &completions);
        let engine = ProgressEngine::default();
        assert_eq!(
            engine.count_in_window(habit.completions(), &now, Granularity::Month),
            1
        );
    }

    #[test]
    fn window_counts_match_individual_windows() {
        let engine = ProgressEngine::default();
        let now = at(2025, 6, 18, 20);
        let completions = [
            at(2025, 5, 31, 9),
            at(2025, 6, 2, 9),
            at(2025, 6, 16, 9),
            at(2025, 6, 18, 7),
            at(2025, 6, 18, 19),
        ];
        let habit = habit_with(true, 2, Timescale::Daily, &completions);
        let counts = engine.window_counts(&habit, &now);
        assert_eq!(
            counts,
            WindowCounts {
                daily: 2,
                weekly: 3,
                monthly: 4,
            }
        );
        for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
            assert_eq!(
                counts.get(granularity),
                engine.count_in_window(habit.completions(), &now, granularity)
            );
        }
    }

    #[test]
    fn windows_are_evaluated_in_the_callers_zone() {
        let engine = ProgressEngine::default();
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        // 03:00 UTC on the 1st is still the 31st in UTC-5.
        let habit = habit_with(true, 1, Timescale::Monthly, &[at(2025, 8, 1, 3)]);
        let now = at(2025, 7, 31, 20).with_timezone(&minus_five);
        assert_eq!(
            engine.count_in_window(habit.completions(), &now, Granularity::Month),
            1
        );
    }

    #[test]
    fn plural_is_everything_but_one() {
        assert!(is_plural(0));
        assert!(!is_plural(1));
        assert!(is_plural(2));
    }

    #[test]
    fn zero_goal_scores_full_or_violated() {
        let engine = ProgressEngine::default();
        let now = at(2025, 6, 18, 12);
        let clean = habit_with(false, 0, Timescale::Daily, &[at(2025, 6, 17, 12)]);
        assert_eq!(
            engine.progress_percent(&clean, &now),
            Progress {
                percent: 100.0,
                qualifier: Qualifier::At
            }
        );
        assert!(engine.goal_met(&clean, &now));

        let slipped = habit_with(false, 0, Timescale::Daily, &[at(2025, 6, 18, 9)]);
        let progress = engine.progress_percent(&slipped, &now);
        assert_eq!(progress.percent, -100.0);
        assert_eq!(progress.qualifier, Qualifier::At);
        assert!(progress.is_violated());
        assert!(!engine.goal_met(&slipped, &now));
    }

    #[test]
    fn good_habit_scores_towards_and_at() {
        assert_eq!(
            score(true, 5, Some(5)),
            Progress {
                percent: 100.0,
                qualifier: Qualifier::At
            }
        );
        assert_eq!(
            score(true, 5, Some(3)),
            Progress {
                percent: 60.0,
                qualifier: Qualifier::Towards
            }
        );
        assert_eq!(score(true, 2, Some(3)).percent, 150.0);
    }

    #[test]
    fn bad_habit_scores_at_or_below_and_over() {
        assert_eq!(
            score(false, 5, Some(3)),
            Progress {
                percent: 100.0,
                qualifier: Qualifier::AtOrBelow
            }
        );
        assert_eq!(score(false, 5, Some(5)).qualifier, Qualifier::AtOrBelow);
        assert_eq!(
            score(false, 5, Some(7)),
            Progress {
                percent: -40.0,
                qualifier: Qualifier::Over
            }
        );
    }

    #[test]
    fn unrecognized_timescale_defaults_to_zero() {
        let engine = ProgressEngine::default();
        let now = at(2025, 6, 18, 12);
        let mut habit = habit_with(true, 3, Timescale::Daily, &[at(2025, 6, 18, 9)]);
        habit.timescale = Timescale::Unrecognized("Hourly".into());
        assert_eq!(engine.timescale_count(&habit, &now), None);
        let progress = engine.progress_percent(&habit, &now);
        assert_eq!(progress.percent, 0.0);
        assert!(!engine.goal_met(&habit, &now));
    }

    #[test]
    fn progress_is_pure() {
        let engine = ProgressEngine::default();
        let now = at(2025, 6, 18, 12);
        let habit = habit_with(true, 4, Timescale::Weekly, &[at(2025, 6, 16, 9)]);
        let first = engine.progress_percent(&habit, &now);
        let second = engine.progress_percent(&habit, &now);
        assert_eq!(first, second);
        assert_eq!(first.percent, 25.0);
    }

    #[test]
    fn insights_bundle_counts_progress_and_undo() {
        let engine = ProgressEngine::default();
        let now = at(2025, 6, 18, 12);
        let habit = habit_with(
            true,
            2,
            Timescale::Weekly,
            &[at(2025, 6, 16, 9), at(2025, 6, 18, 9)],
        );
        let insights = engine.insights(&habit, &now);
        assert_eq!(insights.counts.weekly, 2);
        assert_eq!(insights.progress.qualifier, Qualifier::At);
        assert!(insights.goal_met);
        assert!(insights.can_undo);
        assert_eq!(insights.message(), "You did it!");
    }
}
