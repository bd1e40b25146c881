//! Per-exercise, per-set workout data and the completion rules that go with it.
//!
//! Every operation addressed to an exercise or set that no longer exists is a
//! no-op: the UI may hold a reference that a concurrent action already removed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ExercisePrescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    /// Used by bilateral exercises, whose only flag is `completed_left`.
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetField {
    Weight,
    Reps,
    Effort,
    Note,
}

impl SetField {
    pub fn affects_records(&self) -> bool {
        matches!(self, SetField::Weight | SetField::Reps)
    }
}

/// Parses a user-entered number. Anything that isn't a finite value > 0
/// counts as absent.
pub fn parse_weight(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w > 0.0)
}

pub fn parse_reps(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|r| *r > 0)
}

/// Effort may legitimately be zero (0 reps in reserve).
pub fn parse_effort(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|e| e.is_finite() && *e >= 0.0)
}

/// One set as the user is filling it in. Numeric fields hold the raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetEntry {
    /// Stable identity for list rendering; unrelated to `set_number`.
    pub id: String,
    pub set_number: u32,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub reps: String,
    #[serde(default)]
    pub effort: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub completed_left: bool,
    #[serde(default)]
    pub completed_right: bool,
    #[serde(default)]
    pub is_pr: bool,
}

impl SetEntry {
    pub fn new(set_number: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            set_number,
            weight: String::new(),
            reps: String::new(),
            effort: String::new(),
            note: String::new(),
            completed_left: false,
            completed_right: false,
            is_pr: false,
        }
    }

    /// Bilateral sets keep their single flag in `completed_left`.
    pub fn is_fully_completed(&self, is_unilateral: bool) -> bool {
        if is_unilateral {
            self.completed_left && self.completed_right
        } else {
            self.completed_left
        }
    }

    pub fn weight_value(&self) -> Option<f64> {
        parse_weight(&self.weight)
    }

    pub fn reps_value(&self) -> Option<u32> {
        parse_reps(&self.reps)
    }

    pub fn effort_value(&self) -> Option<f64> {
        parse_effort(&self.effort)
    }

    /// A set is worth persisting once it has a weight or a rep count.
    pub fn has_data(&self) -> bool {
        self.weight_value().is_some() || self.reps_value().is_some()
    }

    fn assign(&mut self, field: SetField, value: &str) {
        let slot = match field {
            SetField::Weight => &mut self.weight,
            SetField::Reps => &mut self.reps,
            SetField::Effort => &mut self.effort,
            SetField::Note => &mut self.note,
        };
        *slot = value.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionExercise {
    pub prescription: ExercisePrescription,
    pub sets: Vec<SetEntry>,
}

impl SessionExercise {
    /// Starts an exercise with its prescribed number of blank sets.
    pub fn from_prescription(prescription: ExercisePrescription) -> Self {
        let sets = (1..=prescription.set_count).map(SetEntry::new).collect();
        Self { prescription, sets }
    }

    pub fn id(&self) -> &str {
        &self.prescription.exercise_id
    }

    pub fn is_unilateral(&self) -> bool {
        self.prescription.is_unilateral
    }

    pub fn set(&self, set_number: u32) -> Option<&SetEntry> {
        self.sets.iter().find(|s| s.set_number == set_number)
    }

    fn set_mut(&mut self, set_number: u32) -> Option<&mut SetEntry> {
        self.sets.iter_mut().find(|s| s.set_number == set_number)
    }

    fn renumber(&mut self) {
        for (index, set) in self.sets.iter_mut().enumerate() {
            set.set_number = index as u32 + 1;
        }
    }
}

/// What a completion toggle did to a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionChange {
    pub side: Side,
    pub status: bool,
    pub is_unilateral: bool,
    pub completed_left: bool,
    pub completed_right: bool,
    pub was_fully_completed: bool,
    pub is_fully_completed: bool,
}

impl CompletionChange {
    /// A unilateral set just got one side done while the other is still open.
    pub fn finished_one_side(&self) -> bool {
        self.is_unilateral
            && self.status
            && self.side != Side::Both
            && (self.completed_left != self.completed_right)
    }

    pub fn became_fully_completed(&self) -> bool {
        !self.was_fully_completed && self.is_fully_completed
    }
}

/// A removed set and where it sat, so the removal can be undone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedSet {
    pub index: usize,
    pub set: SetEntry,
}

/// The mutable set data of a whole workout, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutSets {
    exercises: Vec<SessionExercise>,
}

impl WorkoutSets {
    pub fn new(exercises: Vec<SessionExercise>) -> Self {
        Self { exercises }
    }

    pub fn exercises(&self) -> &[SessionExercise] {
        &self.exercises
    }

    pub fn exercise(&self, exercise_id: &str) -> Option<&SessionExercise> {
        self.exercises.iter().find(|e| e.id() == exercise_id)
    }

    fn exercise_mut(&mut self, exercise_id: &str) -> Option<&mut SessionExercise> {
        let found = self.exercises.iter_mut().find(|e| e.id() == exercise_id);
        if found.is_none() {
            tracing::debug!(exercise_id, "Stale exercise reference ignored");
        }
        found
    }

    pub fn set(&self, exercise_id: &str, set_number: u32) -> Option<&SetEntry> {
        self.exercise(exercise_id)?.set(set_number)
    }

    fn set_mut(&mut self, exercise_id: &str, set_number: u32) -> Option<&mut SetEntry> {
        let found = self.exercise_mut(exercise_id)?.set_mut(set_number);
        if found.is_none() {
            tracing::debug!(exercise_id, set_number, "Stale set reference ignored");
        }
        found
    }

    /// Assigns a raw field value. Returns whether a set was updated.
    pub fn set_field(
        &mut self,
        exercise_id: &str,
        set_number: u32,
        field: SetField,
        value: &str,
    ) -> bool {
        match self.set_mut(exercise_id, set_number) {
            Some(set) => {
                set.assign(field, value);
                true
            }
            None => false,
        }
    }

    pub fn mark_pr(&mut self, exercise_id: &str, set_number: u32, is_pr: bool) {
        if let Some(set) = self.set_mut(exercise_id, set_number) {
            set.is_pr = is_pr;
        }
    }

    pub fn complete_side(
        &mut self,
        exercise_id: &str,
        set_number: u32,
        side: Side,
        status: bool,
    ) -> Option<CompletionChange> {
        let exercise = self.exercise_mut(exercise_id)?;
        let is_unilateral = exercise.is_unilateral();
        let Some(set) = exercise.set_mut(set_number) else {
            tracing::debug!(exercise_id, set_number, "Stale set reference ignored");
            return None;
        };

        let was_fully_completed = set.is_fully_completed(is_unilateral);
        match (is_unilateral, side) {
            (true, Side::Left) => set.completed_left = status,
            (true, Side::Right) => set.completed_right = status,
            (true, Side::Both) => {
                set.completed_left = status;
                set.completed_right = status;
            }
            // Bilateral sets only ever use the primary flag
            (false, _) => set.completed_left = status,
        }

        Some(CompletionChange {
            side,
            status,
            is_unilateral,
            completed_left: set.completed_left,
            completed_right: set.completed_right,
            was_fully_completed,
            is_fully_completed: set.is_fully_completed(is_unilateral),
        })
    }

    /// Appends a set pre-filled with the previous set's weight and reps.
    /// Returns the new set number.
    pub fn add_set(&mut self, exercise_id: &str) -> Option<u32> {
        let exercise = self.exercise_mut(exercise_id)?;
        let mut set = SetEntry::new(exercise.sets.len() as u32 + 1);
        if let Some(previous) = exercise.sets.last() {
            set.weight = previous.weight.clone();
            set.reps = previous.reps.clone();
        }
        let set_number = set.set_number;
        exercise.sets.push(set);
        Some(set_number)
    }

    /// Deletes a set by its stable id and renumbers the rest from 1.
    pub fn remove_set(&mut self, exercise_id: &str, set_id: &str) -> Option<RemovedSet> {
        let exercise = self.exercise_mut(exercise_id)?;
        let Some(index) = exercise.sets.iter().position(|s| s.id == set_id) else {
            tracing::debug!(exercise_id, set_id, "Stale set reference ignored");
            return None;
        };
        let set = exercise.sets.remove(index);
        exercise.renumber();
        Some(RemovedSet { index, set })
    }

    /// Puts a removed set back where it was (clamped to the current length).
    pub fn restore_set(&mut self, exercise_id: &str, removed: RemovedSet) -> bool {
        let Some(exercise) = self.exercise_mut(exercise_id) else {
            return false;
        };
        if exercise.sets.iter().any(|s| s.id == removed.set.id) {
            return false;
        }
        let index = removed.index.min(exercise.sets.len());
        exercise.sets.insert(index, removed.set);
        exercise.renumber();
        true
    }

    /// Adds an exercise mid-session. Exercise ids are unique within a session.
    pub fn add_exercise(&mut self, prescription: ExercisePrescription) -> bool {
        if self.exercise(&prescription.exercise_id).is_some() {
            tracing::debug!(
                exercise_id = %prescription.exercise_id,
                "Exercise already in session"
            );
            return false;
        }
        self.exercises
            .push(SessionExercise::from_prescription(prescription));
        true
    }

    /// Swaps an exercise in place. The replacement keeps the set count and the
    /// superset placement of the exercise it replaces, with fresh set data.
    pub fn replace_exercise(
        &mut self,
        exercise_id: &str,
        mut prescription: ExercisePrescription,
    ) -> bool {
        if prescription.exercise_id != exercise_id
            && self.exercise(&prescription.exercise_id).is_some()
        {
            return false;
        }
        let Some(exercise) = self.exercise_mut(exercise_id) else {
            return false;
        };
        prescription.set_count = exercise.sets.len() as u32;
        prescription.superset_id = exercise.prescription.superset_id.clone();
        prescription.superset_order = exercise.prescription.superset_order;
        *exercise = SessionExercise::from_prescription(prescription);
        true
    }

    pub fn remove_exercise(&mut self, exercise_id: &str) -> Option<SessionExercise> {
        let Some(index) = self.exercises.iter().position(|e| e.id() == exercise_id) else {
            tracing::debug!(exercise_id, "Stale exercise reference ignored");
            return None;
        };
        Some(self.exercises.remove(index))
    }
}
