use std::path::PathBuf;

use clap::{Parser, Subcommand};
use habit_core::{Timescale, WeekStart};

#[derive(Parser, Debug)]
#[command(name = "habits", version, long_about = None)]
#[command(about = "Track good and bad habits against a daily, weekly or monthly goal")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
    #[arg(
        long,
        global = true,
        help = "Habit store file. Defaults to $HABITS_DATA_PATH or $XDG_DATA_HOME/rubber-band-habits/habits.json"
    )]
    pub data: Option<PathBuf>,
    #[arg(long, global = true, help = "First day of the week: sunday or monday")]
    pub week_start: Option<WeekStart>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    #[command(about = "List habits with their current progress")]
    List,
    #[command(about = "Create a habit")]
    Add {
        #[arg(help = "Name, 1 to 12 characters")]
        name: String,
        #[arg(long, short, default_value = "")]
        description: String,
        #[arg(long, help = "Mark as a bad habit: fewer completions are better")]
        bad: bool,
        #[arg(long, short, default_value_t = 0, help = "Target count per timescale, 0 to 50")]
        goal: u32,
        #[arg(
            long,
            short,
            default_value = "daily",
            value_parser = parse_timescale,
            help = "daily, weekly or monthly"
        )]
        timescale: Timescale,
    },
    #[command(about = "Delete a habit and all of its completions")]
    Delete { habit: String },
    #[command(about = "Record a completion now")]
    Done { habit: String },
    #[command(about = "Remove today's latest completion (once per day)")]
    Undo { habit: String },
    #[command(about = "Show counts, progress and the month calendar")]
    Show {
        habit: String,
        #[arg(long, help = "Month to display, 1 to 12. Defaults to the current month")]
        month: Option<u32>,
        #[arg(long, help = "Year to display. Defaults to the current year")]
        year: Option<i32>,
    },
    #[command(about = "Print a shareable summary")]
    Share { habit: String },
}

fn parse_timescale(value: &str) -> Result<Timescale, String> {
    value.parse().map_err(|err: habit_core::HabitError| err.to_string())
}
