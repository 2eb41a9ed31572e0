use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Datelike, TimeZone};
use habit_core::{
    calendar::{DayCell, MonthGrid},
    progress::Granularity,
    share, Habit, HabitDraft, HabitService, JsonFileRepository, UndoOutcome, WeekStart,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cli::{Args, Command};

const APP_DIR: &str = "rubber-band-habits";
const STORE_FILE: &str = "habits.json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) data_path: PathBuf,
    pub(crate) week_start: WeekStart,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("HABITS_DATA_PATH") {
            if !path.trim().is_empty() {
                config.data_path = PathBuf::from(path);
            }
        }
        if let Ok(value) = std::env::var("HABITS_WEEK_START") {
            match value.parse::<WeekStart>() {
                Ok(week_start) => config.week_start = week_start,
                Err(err) => tracing::warn!(%err, "ignoring HABITS_WEEK_START"),
            }
        }
        Ok(config)
    }

    /// Command-line options win over the environment.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(path) = &args.data {
            self.data_path = path.clone();
        }
        if let Some(week_start) = args.week_start {
            self.week_start = week_start;
        }
    }

    pub fn data_path(&self) -> &PathBuf {
        &self.data_path
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    fn default_data_path() -> PathBuf {
        let base = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|_| {
                std::env::var("HOME").map(|home| {
                    let mut path = PathBuf::from(home);
                    path.push(".local/share");
                    path
                })
            })
            .ok();
        match base {
            Some(mut path) => {
                path.push(APP_DIR);
                path.push(STORE_FILE);
                path
            }
            None => PathBuf::from(STORE_FILE),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: Self::default_data_path(),
            week_start: WeekStart::default(),
        }
    }
}

pub fn open_service(config: &AppConfig) -> Result<HabitService> {
    info!(path = %config.data_path.display(), "opening habit store");
    HabitService::builder()
        .with_repository(JsonFileRepository::new(&config.data_path))
        .week_start(config.week_start)
        .build()
        .context("failed to open habit store")
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    let service = open_service(&config)?;
    let now = chrono::Local::now();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&service, command, &now, &mut out)
}

/// Runs one command against `service` as of `now` and writes the result to `out`.
pub fn execute<Tz: TimeZone>(
    service: &HabitService,
    command: Command,
    now: &DateTime<Tz>,
    out: &mut impl Write,
) -> Result<()> {
    debug!(?command, "executing command");
    match command {
        Command::List => {
            let habits = service.habits();
            if habits.is_empty() {
                writeln!(out, "No habits yet. Add one with `habits add <NAME>`.")?;
            }
            for habit in &habits {
                let insights = service.engine().insights(habit, now);
                writeln!(
                    out,
                    "{}  {:<12}  {:<4}  {}",
                    short_id(habit.id()),
                    habit.name,
                    if habit.is_good { "good" } else { "bad" },
                    share::progress_caption(&insights.progress, habit)
                )?;
            }
        }
        Command::Add {
            name,
            description,
            bad,
            goal,
            timescale,
        } => {
            let draft = HabitDraft::new(name)
                .description(description)
                .good(!bad)
                .goal(goal, timescale);
            let habit = service.add(draft).context("habit not created")?;
            writeln!(
                out,
                "Added {} ({}): {} time{} per {}",
                habit.name,
                short_id(habit.id()),
                habit.goal_frequency,
                if habit.goal_frequency == 1 { "" } else { "s" },
                habit.timescale.unit_noun()
            )?;
        }
        Command::Delete { habit } => {
            let habit = resolve(service, &habit)?;
            let removed = service.delete(habit.id())?;
            writeln!(
                out,
                "Deleted {} and {} completion{}",
                removed.name,
                removed.completions().len(),
                if removed.completions().len() == 1 { "" } else { "s" }
            )?;
        }
        Command::Done { habit } => {
            let habit = resolve(service, &habit)?;
            service.record_completion(habit.id(), now)?;
            let insights = service.insights(habit.id(), now)?;
            writeln!(
                out,
                "{}: {}",
                habit.name,
                share::count_caption(insights.counts.daily, Granularity::Day)
            )?;
            writeln!(out, "{}", share::progress_caption(&insights.progress, &habit))?;
        }
        Command::Undo { habit } => {
            let habit = resolve(service, &habit)?;
            match service.undo_last_completion(habit.id(), now)? {
                UndoOutcome::Performed(_) => {
                    let insights = service.insights(habit.id(), now)?;
                    writeln!(out, "Undid today's latest completion of {}", habit.name)?;
                    writeln!(out, "{}", share::progress_caption(&insights.progress, &habit))?;
                }
                UndoOutcome::AlreadyUsedToday => {
                    writeln!(out, "Undo already used today for {}", habit.name)?;
                }
                UndoOutcome::NothingToUndo => {
                    writeln!(out, "Nothing to undo today for {}", habit.name)?;
                }
            }
        }
        Command::Show { habit, month, year } => {
            let habit = resolve(service, &habit)?;
            let insights = service.insights(habit.id(), now)?;
            let today = now.date_naive();
            let grid = service.month_grid(
                habit.id(),
                year.unwrap_or(today.year()),
                month.unwrap_or(today.month()),
                &now.timezone(),
            )?;

            writeln!(out, "{} Insights", habit.name)?;
            if let Some(description) = &habit.description {
                writeln!(out, "{description}")?;
            }
            writeln!(out)?;
            for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
                writeln!(
                    out,
                    "{}",
                    share::count_caption(insights.counts.get(granularity), granularity)
                )?;
            }
            writeln!(out, "{}", share::progress_caption(&insights.progress, &habit))?;
            writeln!(out, "{}", insights.message())?;
            if insights.can_undo {
                writeln!(out, "Undo available (once per day)")?;
            }
            writeln!(out)?;
            write!(out, "{}", render_grid(&grid))?;
        }
        Command::Share { habit } => {
            let habit = resolve(service, &habit)?;
            writeln!(out, "{}", service.share_text(habit.id(), now)?)?;
        }
    }
    Ok(())
}

/// Finds a habit by full id, id prefix or case-insensitive name.
pub fn resolve(service: &HabitService, query: &str) -> Result<Habit> {
    let query = query.trim();
    if let Ok(id) = Uuid::parse_str(query) {
        return Ok(service.get(id)?);
    }

    let habits = service.habits();
    let name = query.to_lowercase();
    let by_name: Vec<&Habit> = habits
        .iter()
        .filter(|habit| habit.name.to_lowercase() == name)
        .collect();
    let matches = if by_name.is_empty() {
        let prefix = name.replace('-', "");
        habits
            .iter()
            .filter(|habit| {
                !prefix.is_empty() && habit.id().simple().to_string().starts_with(&prefix)
            })
            .collect()
    } else {
        by_name
    };

    match matches.as_slice() {
        [habit] => Ok((*habit).clone()),
        [] => Err(anyhow!("no habit matches `{query}`")),
        many => bail!(
            "`{query}` matches {} habits, use one of the ids: {}",
            many.len(),
            many.iter()
                .map(|habit| short_id(habit.id()))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

pub fn short_id(id: Uuid) -> String {
    let mut simple = id.simple().to_string();
    simple.truncate(8);
    simple
}

fn weekday_header(week_start: WeekStart) -> &'static str {
    match week_start {
        WeekStart::Sunday => "Su  Mo  Tu  We  Th  Fr  Sa",
        WeekStart::Monday => "Mo  Tu  We  Th  Fr  Sa  Su",
    }
}

fn render_cell(cell: &DayCell) -> String {
    match (cell.day(), cell.is_completed) {
        (Some(day), true) => format!("{day:>2}*"),
        (Some(day), false) => format!("{day:>2} "),
        (None, _) => "   ".to_string(),
    }
}

/// Text calendar with completed days marked `*`. Trailing blank weeks are omitted.
pub fn render_grid(grid: &MonthGrid) -> String {
    let mut lines = vec![
        format!("{} {}", grid.month_name(), grid.year),
        weekday_header(grid.week_start).to_string(),
    ];
    lines.extend(
        grid.weeks()
            .filter(|week| week.iter().any(|cell| cell.is_current_month()))
            .map(|week| {
                let row = week.iter().map(render_cell).collect::<Vec<_>>().join(" ");
                row.trim_end().to_string()
            }),
    );
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
