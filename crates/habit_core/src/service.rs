use chrono::{DateTime, TimeZone};
use parking_lot::RwLock;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    calendar::{self, MonthGrid},
    error::{HabitError, Result},
    habit::{Completion, Habit, HabitDraft, UndoOutcome},
    progress::{HabitInsights, ProgressEngine, WeekStart},
    share,
    store::{HabitRepository, MemoryRepository},
};

/// Owns the habit list and is the only place it is mutated. Every mutation is saved
/// through the repository before the in-memory list changes.
pub struct HabitService {
    repository: Box<dyn HabitRepository>,
    engine: ProgressEngine,
    habits: RwLock<Vec<Habit>>,
}

pub struct HabitServiceBuilder {
    repository: Option<Box<dyn HabitRepository>>,
    week_start: WeekStart,
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self {
            repository: None,
            week_start: WeekStart::default(),
        }
    }

    pub fn with_repository(mut self, repository: impl HabitRepository + 'static) -> Self {
        self.repository = Some(Box::new(repository));
        self
    }

    pub fn week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn build(self) -> Result<HabitService> {
        let repository = self
            .repository
            .unwrap_or_else(|| Box::new(MemoryRepository::new()));
        let service = HabitService {
            repository,
            engine: ProgressEngine::new(self.week_start),
            habits: RwLock::new(Vec::new()),
        };
        service.reload()?;
        Ok(service)
    }
}

impl Default for HabitServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    pub fn engine(&self) -> ProgressEngine {
        self.engine
    }

    pub fn reload(&self) -> Result<()> {
        let loaded = self.repository.load()?;
        *self.habits.write() = loaded;
        Ok(())
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.habits.read().clone()
    }

    pub fn get(&self, id: Uuid) -> Result<Habit> {
        self.habits
            .read()
            .iter()
            .find(|habit| habit.id() == id)
            .cloned()
            .ok_or(HabitError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub fn add(&self, draft: HabitDraft) -> Result<Habit> {
        let habit = draft.into_habit()?;
        let added = habit.clone();
        self.mutate(|habits| {
            habits.push(habit);
            Ok(())
        })?;
        tracing::info!(habit = %added.id(), name = %added.name, "habit added");
        Ok(added)
    }

    /// Removes the habit together with all of its completions.
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<Habit> {
        let removed = self.mutate(|habits| {
            let idx = habits
                .iter()
                .position(|habit| habit.id() == id)
                .ok_or(HabitError::NotFound(id))?;
            Ok(habits.remove(idx))
        })?;
        tracing::info!(
            habit = %id,
            completions = removed.completions().len(),
            "habit deleted"
        );
        Ok(removed)
    }

    #[instrument(skip(self, now))]
    pub fn record_completion<Tz: TimeZone>(
        &self,
        id: Uuid,
        now: &DateTime<Tz>,
    ) -> Result<Completion> {
        self.mutate(|habits| {
            let habit = Self::find_mut(habits, id)?;
            Ok(habit.record_completion(now).clone())
        })
    }

    #[instrument(skip(self, now))]
    pub fn undo_last_completion<Tz: TimeZone>(
        &self,
        id: Uuid,
        now: &DateTime<Tz>,
    ) -> Result<UndoOutcome> {
        let mut habits = self.habits.write();
        let mut next = habits.clone();
        let outcome = Self::find_mut(&mut next, id)?.undo_last_completion(now);
        if outcome.is_performed() {
            self.repository.save(&next)?;
            *habits = next;
        } else {
            tracing::debug!(habit = %id, ?outcome, "undo not performed");
        }
        Ok(outcome)
    }

    pub fn insights<Tz: TimeZone>(&self, id: Uuid, now: &DateTime<Tz>) -> Result<HabitInsights> {
        self.with_habit(id, |habit| self.engine.insights(habit, now))
    }

    pub fn month_grid<Tz: TimeZone>(
        &self,
        id: Uuid,
        year: i32,
        month: u32,
        tz: &Tz,
    ) -> Result<MonthGrid> {
        self.with_habit(id, |habit| {
            calendar::month_grid(
                year,
                month,
                habit.completions(),
                tz,
                self.engine.week_start(),
            )
        })?
    }

    pub fn share_text<Tz: TimeZone>(&self, id: Uuid, now: &DateTime<Tz>) -> Result<String> {
        self.with_habit(id, |habit| {
            share::share_text(habit, &self.engine.window_counts(habit, now))
        })
    }
}

impl HabitService {
    fn with_habit<R>(&self, id: Uuid, f: impl FnOnce(&Habit) -> R) -> Result<R> {
        let habits = self.habits.read();
        let habit = habits
            .iter()
            .find(|habit| habit.id() == id)
            .ok_or(HabitError::NotFound(id))?;
        Ok(f(habit))
    }

    fn find_mut(habits: &mut [Habit], id: Uuid) -> Result<&mut Habit> {
        habits
            .iter_mut()
            .find(|habit| habit.id() == id)
            .ok_or(HabitError::NotFound(id))
    }

    /// Applies `f` to a copy of the list, persists the copy, then publishes it.
    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Habit>) -> Result<R>) -> Result<R> {
        let mut habits = self.habits.write();
        let mut next = habits.clone();
        let result = f(&mut next)?;
        self.repository.save(&next)?;
        *habits = next;
        Ok(result)
    }
}
