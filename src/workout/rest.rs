//! Rest periods between sides, sets and exercises.

use std::collections::HashMap;

use serde::Serialize;

use super::sets::{CompletionChange, SessionExercise};

pub const SWITCH_SIDES_MESSAGE: &str = "Switch sides";
pub const WORKOUT_FINISHED_LABEL: &str = "Workout Finished";
/// Used when a unilateral exercise has no side rest configured.
pub const DEFAULT_SIDE_REST_SECS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestPhase {
    #[default]
    Idle,
    RestingBetweenSides,
    RestingBetweenSets,
}

/// What the rest overlay shows. Inactive once dismissed or expired.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestTimer {
    pub is_active: bool,
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub next_label: String,
    pub override_message: Option<String>,
}

impl RestTimer {
    /// Text shown under the countdown.
    pub fn label(&self) -> &str {
        self.override_message.as_deref().unwrap_or(&self.next_label)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestController {
    phase: RestPhase,
    timer: RestTimer,
    /// Bumped on every rest start so the owner can restart its countdown task.
    generation: u64,
}

impl RestController {
    pub fn phase(&self) -> RestPhase {
        self.phase
    }

    pub fn timer(&self) -> &RestTimer {
        &self.timer
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_active
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a rest, replacing whatever rest was running.
    pub fn start(
        &mut self,
        phase: RestPhase,
        duration_seconds: u32,
        next_label: String,
        override_message: Option<String>,
    ) {
        if phase == RestPhase::Idle || duration_seconds == 0 {
            return;
        }
        tracing::debug!(?phase, duration_seconds, "Rest started");
        self.phase = phase;
        self.timer = RestTimer {
            is_active: true,
            duration_seconds,
            remaining_seconds: duration_seconds,
            next_label,
            override_message,
        };
        self.generation += 1;
    }

    /// One countdown step. Returns whether the rest is still running.
    pub fn tick(&mut self) -> bool {
        if !self.timer.is_active {
            return false;
        }
        self.timer.remaining_seconds = self.timer.remaining_seconds.saturating_sub(1);
        if self.timer.remaining_seconds == 0 {
            tracing::debug!("Rest expired");
            self.finish();
            return false;
        }
        true
    }

    pub fn dismiss(&mut self) {
        if self.timer.is_active {
            tracing::debug!(remaining = self.timer.remaining_seconds, "Rest dismissed");
        }
        self.finish();
    }

    fn finish(&mut self) {
        self.phase = RestPhase::Idle;
        self.timer = RestTimer::default();
    }

    /// Decides which rest, if any, follows a completion toggle on `exercise_id`.
    pub fn on_completion(
        &mut self,
        exercises: &[SessionExercise],
        exercise_id: &str,
        change: &CompletionChange,
    ) -> RestPhase {
        let Some(exercise) = exercises.iter().find(|e| e.id() == exercise_id) else {
            return RestPhase::Idle;
        };

        if change.finished_one_side() {
            let configured = exercise.prescription.side_rest.total_seconds();
            let duration = if configured == 0 {
                DEFAULT_SIDE_REST_SECS
            } else {
                configured
            };
            self.start(
                RestPhase::RestingBetweenSides,
                duration,
                exercise.prescription.name.clone(),
                Some(SWITCH_SIDES_MESSAGE.to_string()),
            );
            return self.phase;
        }

        if change.became_fully_completed() {
            let groups = exercise_groups(exercises);
            if !closes_group(&groups, exercises, exercise_id) {
                // Superset members run back to back
                return RestPhase::Idle;
            }
            let duration = exercise.prescription.rest.total_seconds();
            if duration == 0 {
                return RestPhase::Idle;
            }
            let label = next_group_label(&groups, exercises, exercise_id)
                .unwrap_or_else(|| WORKOUT_FINISHED_LABEL.to_string());
            self.start(RestPhase::RestingBetweenSets, duration, label, None);
            return self.phase;
        }

        RestPhase::Idle
    }
}

/// Partitions exercises (by index) into superset clusters and singletons.
/// Groups keep the order their first member was added in; members of a
/// superset are ordered by their superset order, then insertion order.
pub fn exercise_groups(exercises: &[SessionExercise]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_superset: HashMap<&str, usize> = HashMap::new();

    for (index, exercise) in exercises.iter().enumerate() {
        match exercise.prescription.superset() {
            Some(superset_id) => match by_superset.get(superset_id) {
                Some(&group) => groups[group].push(index),
                None => {
                    by_superset.insert(superset_id, groups.len());
                    groups.push(vec![index]);
                }
            },
            None => groups.push(vec![index]),
        }
    }

    for group in &mut groups {
        group.sort_by_key(|&i| {
            (
                exercises[i].prescription.superset_order.unwrap_or(u32::MAX),
                i,
            )
        });
    }
    groups
}

fn group_of(groups: &[Vec<usize>], exercises: &[SessionExercise], exercise_id: &str) -> Option<usize> {
    groups
        .iter()
        .position(|g| g.iter().any(|&i| exercises[i].id() == exercise_id))
}

/// Standalone exercises and the last member of a superset close their group.
fn closes_group(groups: &[Vec<usize>], exercises: &[SessionExercise], exercise_id: &str) -> bool {
    group_of(groups, exercises, exercise_id)
        .and_then(|g| groups[g].last())
        .is_some_and(|&last| exercises[last].id() == exercise_id)
}

/// Display name of the first exercise of the group after the current one.
fn next_group_label(
    groups: &[Vec<usize>],
    exercises: &[SessionExercise],
    exercise_id: &str,
) -> Option<String> {
    let current = group_of(groups, exercises, exercise_id)?;
    let next = groups.get(current + 1)?;
    next.first()
        .map(|&i| exercises[i].prescription.name.clone())
}
