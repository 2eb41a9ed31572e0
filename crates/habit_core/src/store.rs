use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::{HabitError, Result};
use crate::habit::Habit;

/// Persistence boundary for the habit list. Implementations store the whole list at once.
pub trait HabitRepository: Send + Sync {
    fn load(&self) -> Result<Vec<Habit>>;
    fn save(&self, habits: &[Habit]) -> Result<()>;
}

/// Stores habits as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "habits.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> HabitError {
        HabitError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl HabitRepository for JsonFileRepository {
    fn load(&self) -> Result<Vec<Habit>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no habit store yet, starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(self.io_error(err)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let habits: Vec<Habit> =
            serde_json::from_str(&raw).map_err(|source| HabitError::Serialization {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(path = %self.path.display(), count = habits.len(), "loaded habits");
        Ok(habits)
    }

    fn save(&self, habits: &[Habit]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
            }
        }
        let payload =
            serde_json::to_string_pretty(habits).map_err(|source| HabitError::Serialization {
                path: self.path.clone(),
                source,
            })?;
        let temp = self.temp_path();
        fs::write(&temp, payload).map_err(|err| self.io_error(err))?;
        fs::rename(&temp, &self.path).map_err(|err| self.io_error(err))?;
        tracing::debug!(path = %self.path.display(), count = habits.len(), "saved habits");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    habits: RwLock<Vec<Habit>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_habits(habits: Vec<Habit>) -> Self {
        Self {
            habits: RwLock::new(habits),
        }
    }

    pub fn stored(&self) -> Vec<Habit> {
        self.habits.read().clone()
    }
}

impl HabitRepository for MemoryRepository {
    fn load(&self) -> Result<Vec<Habit>> {
        Ok(self.habits.read().clone())
    }

    fn save(&self, habits: &[Habit]) -> Result<()> {
        *self.habits.write() = habits.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{HabitDraft, Timescale};
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty() {
        let temp = tempdir().expect("tempdir");
        let repo = JsonFileRepository::new(temp.path().join("habits.json"));
        assert!(repo.load().expect("load").is_empty());
    }

    #[test]
    fn save_creates_parents_and_leaves_no_temp_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("habits.json");
        let repo = JsonFileRepository::new(&path);
        let habit = HabitDraft::new("Floss")
            .goal(1, Timescale::Daily)
            .into_habit()
            .unwrap();
        repo.save(std::slice::from_ref(&habit)).expect("save");

        assert!(path.exists());
        assert!(!repo.temp_path().exists());
        assert_eq!(repo.load().expect("load"), vec![habit]);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("habits.json");
        fs::write(&path, "{ not json").expect("write fixture");
        let err = JsonFileRepository::new(&path).load().unwrap_err();
        assert!(matches!(err, HabitError::Serialization { .. }));
    }

    #[test]
    fn memory_repository_round_trips() {
        let repo = MemoryRepository::new();
        let habit = HabitDraft::new("Journal").into_habit().unwrap();
        repo.save(std::slice::from_ref(&habit)).unwrap();
        assert_eq!(repo.load().unwrap(), vec![habit]);
    }
}
