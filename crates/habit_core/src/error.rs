use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

pub type Result<T, E = HabitError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HabitError {
    #[error("habit name must be 1 to {max} characters, got {len}")]
    InvalidName { len: usize, max: usize },

    #[error("goal frequency must be between 0 and {max}, got {value}")]
    InvalidGoal { value: u32, max: u32 },

    #[error("unknown timescale `{0}` (expected Daily, Weekly or Monthly)")]
    UnknownTimescale(String),

    #[error("unknown week start `{0}` (expected sunday or monday)")]
    UnknownWeekStart(String),

    #[error("{year}-{month:02} is not a valid month")]
    InvalidMonth { year: i32, month: u32 },

    #[error("habit {0} not found")]
    NotFound(Uuid),

    #[error("unable to access habit store at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("habit store at {} is not valid JSON", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
