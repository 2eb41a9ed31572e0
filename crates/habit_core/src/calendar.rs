use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};
use crate::habit::Completion;
use crate::progress::{local_date, WeekStart};

/// Six rows of seven days, enough for any month at any offset.
pub const GRID_CELLS: usize = 42;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> Option<&'static str> {
    let idx = usize::try_from(month.checked_sub(1)?).ok()?;
    MONTH_NAMES.get(idx).copied()
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Column of day 1 in the grid, 0 being the first day of the week.
pub fn start_offset(year: i32, month: u32, week_start: WeekStart) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(week_start.days_from_start(first.weekday()))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayCell {
    /// `None` for cells outside the month.
    pub date: Option<NaiveDate>,
    pub is_completed: bool,
}

impl DayCell {
    pub fn is_current_month(&self) -> bool {
        self.date.is_some()
    }

    pub fn day(&self) -> Option<u32> {
        self.date.map(|date| date.day())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    pub start_offset: u32,
    pub week_start: WeekStart,
    pub cells: Vec<DayCell>,
}

impl MonthGrid {
    pub fn month_name(&self) -> &'static str {
        month_name(self.month).unwrap_or("Invalid month")
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell]> {
        self.cells.chunks(7)
    }

    pub fn completed_days(&self) -> Vec<u32> {
        self.cells
            .iter()
            .filter(|cell| cell.is_completed)
            .filter_map(DayCell::day)
            .collect()
    }
}

/// Lays out `month` of `year` and marks the days that have at least one completion in `tz`.
pub fn month_grid<Tz: TimeZone>(
    year: i32,
    month: u32,
    completions: &[Completion],
    tz: &Tz,
    week_start: WeekStart,
) -> Result<MonthGrid> {
    let invalid = || HabitError::InvalidMonth { year, month };
    let days_in_month = days_in_month(year, month).ok_or_else(invalid)?;
    let start_offset = start_offset(year, month, week_start).ok_or_else(invalid)?;

    let completed: HashSet<NaiveDate> = completions
        .iter()
        .map(|completion| local_date(&completion.date, tz))
        .collect();

    let mut cells = Vec::with_capacity(GRID_CELLS);
    for index in 0..GRID_CELLS as u32 {
        let date = index
            .checked_sub(start_offset)
            .map(|day0| day0 + 1)
            .filter(|day| *day <= days_in_month)
            .and_then(|day| NaiveDate::from_ymd_opt(year, month, day));
        let is_completed = date.map(|date| completed.contains(&date)).unwrap_or(false);
        cells.push(DayCell { date, is_completed });
    }

    Ok(MonthGrid {
        year,
        month,
        days_in_month,
        start_offset,
        week_start,
        cells,
    })
}
