use crate::habit::Habit;
use crate::progress::{is_plural, Granularity, Progress, WindowCounts};

fn period_phrase(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Day => "today",
        Granularity::Week => "this week",
        Granularity::Month => "this month",
    }
}

fn suffix(count: usize) -> &'static str {
    if is_plural(count) {
        "s"
    } else {
        ""
    }
}

/// Headline for a count widget, e.g. `"3 Times this week"`.
pub fn count_caption(count: usize, granularity: Granularity) -> String {
    format!(
        "{count} Time{} {}",
        suffix(count),
        period_phrase(granularity)
    )
}

/// Progress line, e.g. `"60% Towards 5 Times Daily"`.
pub fn progress_caption(progress: &Progress, habit: &Habit) -> String {
    let goal = habit.goal_frequency as usize;
    format!(
        "{:.0}% {} {} Time{} {}",
        progress.percent,
        progress.qualifier,
        goal,
        suffix(goal),
        habit.timescale
    )
}

/// Summary other apps receive when the user shares a habit.
pub fn share_text(habit: &Habit, counts: &WindowCounts) -> String {
    let line = |granularity: Granularity| {
        let count = counts.get(granularity);
        format!(
            "{count} time{} {}!",
            suffix(count),
            period_phrase(granularity)
        )
    };
    format!(
        "I've done {}\n{}\n{}\n{}",
        habit.name,
        line(Granularity::Day),
        line(Granularity::Week),
        line(Granularity::Month)
    )
}
