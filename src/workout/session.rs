use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{
    EffortMetric, ExercisePrescription, NewWorkoutSession, Routine, WorkoutSession,
};

use super::assembler;
use super::clock::SessionClock;
use super::records::{LastPerformance, PreviousSet, RecordBook};
use super::rest::{RestController, RestPhase, RestTimer};
use super::sets::{RemovedSet, SetEntry, SetField, Side, WorkoutSets};

/// The stored session a workout was loaded from, when editing.
#[derive(Debug, Clone)]
struct EditTarget {
    session_id: String,
    completed_at: DateTime<Utc>,
    duration_secs: i64,
}

/// A finished workout ready for the session store. `editing` carries the id
/// of the stored session to update instead of creating a new one.
#[derive(Debug, Clone)]
pub struct FinishedWorkout {
    pub editing: Option<String>,
    pub session: NewWorkoutSession,
}

/// Everything about one running workout. Each event handler updates set data,
/// then records, then rest state, so a snapshot never shows a completed set
/// without its PR flag and rest already resolved.
#[derive(Debug, Clone)]
pub struct ActiveWorkout {
    user_id: String,
    routine_id: Option<String>,
    routine_name: String,
    effort_metric: EffortMetric,
    editing: Option<EditTarget>,
    clock: SessionClock,
    sets: WorkoutSets,
    records: RecordBook,
    previous: LastPerformance,
    rest: RestController,
}

impl ActiveWorkout {
    /// Starts a workout from a routine. `history` seeds records and placeholders.
    pub fn start(
        user_id: &str,
        routine: &Routine,
        history: &[WorkoutSession],
        effort_metric: EffortMetric,
        now: DateTime<Utc>,
    ) -> Self {
        let mut workout = Self {
            user_id: user_id.to_string(),
            routine_id: None,
            routine_name: String::new(),
            effort_metric,
            editing: None,
            clock: SessionClock::new(now),
            sets: WorkoutSets::default(),
            records: RecordBook::from_history(history),
            previous: LastPerformance::from_history(history),
            rest: RestController::default(),
        };
        workout.begin(routine, now);
        workout
    }

    /// Loads a routine's prescribed sets, discarding any logged data, rest and
    /// records set so far. History-derived state is kept.
    fn begin(&mut self, routine: &Routine, now: DateTime<Utc>) {
        self.routine_id = Some(routine.id.clone());
        self.routine_name = routine.name.clone();
        self.editing = None;
        self.clock = SessionClock::new(now);
        self.sets = assembler::start(&routine.exercises);
        self.records.reset();
        self.rest = RestController::default();
    }

    /// Reopens a stored session. Its own sets seed the in-session records
    /// rather than the history, so the PR flags they carry stay meaningful.
    /// `prescriptions` is the session's routine, when it still exists.
    pub fn load_for_edit<F>(
        session: &WorkoutSession,
        prescriptions: &[ExercisePrescription],
        history: &[WorkoutSession],
        resolve_name: F,
        now: DateTime<Utc>,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let others: Vec<WorkoutSession> = history
            .iter()
            .filter(|s| s.id != session.id)
            .cloned()
            .collect();
        let sets = assembler::load_for_edit(session, prescriptions, resolve_name);
        // The session's own lifts are the bar for edits made to it
        let mut records = RecordBook::from_history(&others);
        for exercise in sets.exercises() {
            for set in &exercise.sets {
                records.record_if_new(exercise.id(), &set.reps, &set.weight);
            }
        }
        Self {
            user_id: session.user_id.clone(),
            routine_id: session.routine_id.clone(),
            routine_name: session.routine_name.clone(),
            effort_metric: session.effort_metric,
            editing: Some(EditTarget {
                session_id: session.id.clone(),
                completed_at: session.completed_at,
                duration_secs: session.duration_secs,
            }),
            clock: SessionClock::new(now),
            sets,
            records,
            previous: LastPerformance::from_history(&others),
            rest: RestController::default(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn sets(&self) -> &WorkoutSets {
        &self.sets
    }

    pub fn records(&self) -> &RecordBook {
        &self.records
    }

    pub fn rest(&self) -> &RestController {
        &self.rest
    }

    pub fn editing_session_id(&self) -> Option<&str> {
        self.editing.as_ref().map(|e| e.session_id.as_str())
    }

    /// Replaces the historical record map, e.g. when the history feed updates.
    pub fn refresh_history(&mut self, history: &[WorkoutSession]) {
        let editing = self.editing_session_id().map(str::to_string);
        let others: Vec<WorkoutSession> = history
            .iter()
            .filter(|s| Some(s.id.as_str()) != editing.as_deref())
            .cloned()
            .collect();
        self.records.rebuild_historical(&others);
        self.previous = LastPerformance::from_history(&others);
    }

    /// Re-evaluates the PR flag of a set from its current weight and reps.
    fn evaluate_record(&mut self, exercise_id: &str, set_number: u32) {
        let Some(set) = self.sets.set(exercise_id, set_number) else {
            return;
        };
        let (reps, weight) = (set.reps.clone(), set.weight.clone());
        let is_pr = self.records.record_if_new(exercise_id, &reps, &weight);
        self.sets.mark_pr(exercise_id, set_number, is_pr);
    }

    pub fn set_field(
        &mut self,
        exercise_id: &str,
        set_number: u32,
        field: SetField,
        value: &str,
    ) -> bool {
        let unchanged = self.sets.set(exercise_id, set_number).is_some_and(|s| {
            let current = match field {
                SetField::Weight => &s.weight,
                SetField::Reps => &s.reps,
                SetField::Effort => &s.effort,
                SetField::Note => &s.note,
            };
            current == value
        });
        if !self.sets.set_field(exercise_id, set_number, field, value) {
            return false;
        }
        if field.affects_records() && !unchanged {
            self.evaluate_record(exercise_id, set_number);
        }
        true
    }

    /// Toggles completion and returns the rest phase the toggle started, if any.
    pub fn complete_side(
        &mut self,
        exercise_id: &str,
        set_number: u32,
        side: Side,
        status: bool,
    ) -> RestPhase {
        let Some(change) = self
            .sets
            .complete_side(exercise_id, set_number, side, status)
        else {
            return RestPhase::Idle;
        };

        let already_pr = self
            .sets
            .set(exercise_id, set_number)
            .is_some_and(|s| s.is_pr);
        if change.status && !already_pr {
            self.evaluate_record(exercise_id, set_number);
        }

        self.rest
            .on_completion(self.sets.exercises(), exercise_id, &change)
    }

    pub fn add_set(&mut self, exercise_id: &str) -> Option<u32> {
        self.sets.add_set(exercise_id)
    }

    pub fn remove_set(&mut self, exercise_id: &str, set_id: &str) -> Option<RemovedSet> {
        self.sets.remove_set(exercise_id, set_id)
    }

    pub fn restore_set(&mut self, exercise_id: &str, removed: RemovedSet) -> bool {
        self.sets.restore_set(exercise_id, removed)
    }

    pub fn add_exercise(&mut self, prescription: ExercisePrescription) -> bool {
        self.sets.add_exercise(prescription)
    }

    pub fn replace_exercise(&mut self, exercise_id: &str, prescription: ExercisePrescription) -> bool {
        self.sets.replace_exercise(exercise_id, prescription)
    }

    pub fn remove_exercise(&mut self, exercise_id: &str) -> bool {
        self.sets.remove_exercise(exercise_id).is_some()
    }

    pub fn tick_clock(&mut self, now: DateTime<Utc>) -> i64 {
        self.clock.tick(now)
    }

    pub fn stop_clock(&mut self, now: DateTime<Utc>) -> i64 {
        self.clock.stop(now)
    }

    pub fn tick_rest(&mut self) -> bool {
        self.rest.tick()
    }

    pub fn dismiss_rest(&mut self) {
        self.rest.dismiss();
    }

    /// Packages the workout for the session store.
    pub fn finish(&self, now: DateTime<Utc>) -> Result<FinishedWorkout> {
        let exercises = assembler::finish(&self.sets)?;
        let (completed_at, duration_secs) = match &self.editing {
            Some(target) => (target.completed_at, target.duration_secs),
            None => (now, self.clock.elapsed_at(now)),
        };
        Ok(FinishedWorkout {
            editing: self.editing.as_ref().map(|e| e.session_id.clone()),
            session: NewWorkoutSession {
                user_id: self.user_id.clone(),
                routine_id: self.routine_id.clone(),
                routine_name: self.routine_name.clone(),
                completed_at,
                duration_secs,
                effort_metric: self.effort_metric,
                exercises,
            },
        })
    }

    /// Elapsed time is the clock's last tick, so it stays put once stopped.
    pub fn snapshot(&self) -> WorkoutSnapshot {
        let exercises = self
            .sets
            .exercises()
            .iter()
            .map(|exercise| ExerciseSnapshot {
                prescription: exercise.prescription.clone(),
                sets: exercise
                    .sets
                    .iter()
                    .map(|set| SetSnapshot {
                        fully_completed: set.is_fully_completed(exercise.is_unilateral()),
                        previous: self
                            .previous
                            .lookup(exercise.id(), set.set_number)
                            .cloned(),
                        set: set.clone(),
                    })
                    .collect(),
            })
            .collect();

        WorkoutSnapshot {
            user_id: self.user_id.clone(),
            routine_id: self.routine_id.clone(),
            routine_name: self.routine_name.clone(),
            editing_session_id: self.editing_session_id().map(str::to_string),
            effort_metric: self.effort_metric,
            started_at: self.clock.origin(),
            elapsed_secs: self.clock.elapsed_secs(),
            rest_phase: self.rest.phase(),
            rest: self.rest.timer().clone(),
            exercises,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetSnapshot {
    #[serde(flatten)]
    pub set: SetEntry,
    pub fully_completed: bool,
    /// What was lifted in this set position last time
    pub previous: Option<PreviousSet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSnapshot {
    #[serde(flatten)]
    pub prescription: ExercisePrescription,
    pub sets: Vec<SetSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutSnapshot {
    pub user_id: String,
    pub routine_id: Option<String>,
    pub routine_name: String,
    pub editing_session_id: Option<String>,
    pub effort_metric: EffortMetric,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: i64,
    pub rest_phase: RestPhase,
    pub rest: RestTimer,
    pub exercises: Vec<ExerciseSnapshot>,
}
