pub mod calendar;
pub mod error;
pub mod habit;
pub mod progress;
pub mod service;
pub mod share;
pub mod store;

pub use crate::error::{HabitError, Result};
pub use crate::habit::{Completion, Habit, HabitDraft, Timescale, UndoOutcome};
pub use crate::progress::{HabitInsights, Progress, ProgressEngine, Qualifier, WeekStart};
pub use crate::service::{HabitService, HabitServiceBuilder};
pub use crate::store::{HabitRepository, JsonFileRepository, MemoryRepository};
