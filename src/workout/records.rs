//! Personal-record detection.
//!
//! A lift counts as a record when its weight beats the best weight ever lifted
//! for the same exercise and rep count, looking both at stored sessions and at
//! records already set during the running workout.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::WorkoutSession;

use super::sets::{parse_reps, parse_weight};

/// (exercise id, rep count) -> best weight
type BestWeights = HashMap<String, HashMap<u32, f64>>;

fn best_of(map: &BestWeights, exercise_id: &str, reps: u32) -> Option<f64> {
    map.get(exercise_id)?.get(&reps).copied()
}

#[derive(Debug, Clone, Default)]
pub struct RecordBook {
    historical: BestWeights,
    session: BestWeights,
}

impl RecordBook {
    pub fn from_history(sessions: &[WorkoutSession]) -> Self {
        let mut book = Self::default();
        book.rebuild_historical(sessions);
        book
    }

    /// Recomputes the historical map from scratch. Safe to call every time the
    /// sessions feed delivers a new snapshot.
    pub fn rebuild_historical(&mut self, sessions: &[WorkoutSession]) {
        let mut historical = BestWeights::new();
        let entries = sessions.iter().flat_map(|s| s.exercises.iter());
        for exercise in entries {
            for set in &exercise.sets {
                let (Some(reps), Some(weight)) = (set.reps, set.weight) else {
                    continue;
                };
                if reps == 0 || weight.is_nan() || weight <= 0.0 {
                    continue;
                }
                let best = historical
                    .entry(exercise.exercise_id.clone())
                    .or_default()
                    .entry(reps)
                    .or_insert(weight);
                if weight > *best {
                    *best = weight;
                }
            }
        }
        self.historical = historical;
    }

    /// Best weight known for this exercise and rep count, across both maps.
    pub fn best(&self, exercise_id: &str, reps: u32) -> Option<f64> {
        match (
            best_of(&self.historical, exercise_id, reps),
            best_of(&self.session, exercise_id, reps),
        ) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Raw inputs that don't parse to positive numbers never qualify.
    pub fn is_new_record(&self, exercise_id: &str, reps: &str, weight: &str) -> bool {
        let (Some(reps), Some(weight)) = (parse_reps(reps), parse_weight(weight)) else {
            return false;
        };
        weight > self.best(exercise_id, reps).unwrap_or(0.0)
    }

    /// Stores the lift in the session map if it is a record. Returns whether it was.
    pub fn record_if_new(&mut self, exercise_id: &str, reps: &str, weight: &str) -> bool {
        if !self.is_new_record(exercise_id, reps, weight) {
            return false;
        }
        // Both parsed inside is_new_record
        if let (Some(reps), Some(weight)) = (parse_reps(reps), parse_weight(weight)) {
            self.session
                .entry(exercise_id.to_string())
                .or_default()
                .insert(reps, weight);
        }
        true
    }

    /// Forgets records set in the current workout; history stays.
    pub fn reset(&mut self) {
        self.session.clear();
    }
}

/// Weight and reps from the last time an exercise was performed, shown as
/// placeholders while logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviousSet {
    pub weight: Option<f64>,
    pub reps: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct LastPerformance {
    by_exercise: HashMap<String, Vec<PreviousSet>>,
}

impl LastPerformance {
    pub fn from_history(sessions: &[WorkoutSession]) -> Self {
        let mut newest_first: Vec<&WorkoutSession> = sessions.iter().collect();
        newest_first.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

        let mut by_exercise: HashMap<String, Vec<PreviousSet>> = HashMap::new();
        for session in newest_first {
            for exercise in &session.exercises {
                if by_exercise.contains_key(&exercise.exercise_id) {
                    continue;
                }
                let sets = exercise
                    .sets
                    .iter()
                    .map(|s| PreviousSet {
                        weight: s.weight,
                        reps: s.reps,
                    })
                    .collect();
                by_exercise.insert(exercise.exercise_id.clone(), sets);
            }
        }
        Self { by_exercise }
    }

    pub fn lookup(&self, exercise_id: &str, set_number: u32) -> Option<&PreviousSet> {
        let index = (set_number as usize).checked_sub(1)?;
        self.by_exercise.get(exercise_id)?.get(index)
    }
}
