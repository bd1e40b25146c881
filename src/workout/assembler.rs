//! Conversion between live workout state and persisted sessions.

use crate::error::{AppError, Result};
use crate::models::{ExercisePrescription, SessionExerciseRecord, SetRecord, WorkoutSession};

use super::sets::{SessionExercise, SetEntry, WorkoutSets};

/// Fresh set data for a routine: every prescribed set, blank and incomplete.
pub fn start(prescriptions: &[ExercisePrescription]) -> WorkoutSets {
    WorkoutSets::new(
        prescriptions
            .iter()
            .cloned()
            .map(SessionExercise::from_prescription)
            .collect(),
    )
}

fn to_record(set: &SetEntry) -> SetRecord {
    let note = set.note.trim();
    SetRecord {
        set_number: set.set_number,
        weight: set.weight_value(),
        reps: set.reps_value(),
        effort: set.effort_value(),
        note: (!note.is_empty()).then(|| note.to_string()),
        is_pr: set.is_pr,
        completed_left: set.completed_left,
        completed_right: set.completed_right,
        // Single-flag readers see the primary side
        completed: set.completed_left,
    }
}

/// Maps the workout into persisted exercise entries. Sets without weight or
/// reps are dropped, as are exercises left with no sets.
pub fn finish(sets: &WorkoutSets) -> Result<Vec<SessionExerciseRecord>> {
    let exercises: Vec<SessionExerciseRecord> = sets
        .exercises()
        .iter()
        .filter_map(|exercise| {
            let kept: Vec<SetRecord> = exercise
                .sets
                .iter()
                .filter(|s| s.has_data())
                .map(to_record)
                .collect();
            if kept.is_empty() {
                return None;
            }
            let p = &exercise.prescription;
            Some(SessionExerciseRecord {
                exercise_id: p.exercise_id.clone(),
                exercise_name: p.name.clone(),
                is_unilateral: p.is_unilateral,
                superset_id: p.superset_id.clone(),
                superset_order: p.superset_order,
                sets: kept,
            })
        })
        .collect();

    if exercises.is_empty() {
        return Err(AppError::NoDataToSave);
    }
    Ok(exercises)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn from_record(record: &SetRecord) -> SetEntry {
    let mut set = SetEntry::new(record.set_number);
    set.weight = record.weight.map(format_number).unwrap_or_default();
    set.reps = record.reps.map(|r| r.to_string()).unwrap_or_default();
    set.effort = record.effort.map(format_number).unwrap_or_default();
    set.note = record.note.clone().unwrap_or_default();
    set.completed_left = record.completed_left;
    set.completed_right = record.completed_right;
    set.is_pr = record.is_pr;
    set
}

/// Rebuilds editable workout state from a stored session. Names are looked up
/// again through `resolve_name`, falling back to the stored snapshot. Rest
/// periods and rep targets come from the routine's prescription for the same
/// exercise; exercises the routine no longer has get no rest.
pub fn load_for_edit<F>(
    session: &WorkoutSession,
    prescriptions: &[ExercisePrescription],
    resolve_name: F,
) -> WorkoutSets
where
    F: Fn(&str) -> Option<String>,
{
    let exercises = session
        .exercises
        .iter()
        .map(|entry| {
            let mut sets: Vec<SetEntry> = entry.sets.iter().map(from_record).collect();
            sets.sort_by_key(|s| s.set_number);
            // Stored numbering can have gaps where empty sets were dropped
            for (index, set) in sets.iter_mut().enumerate() {
                set.set_number = index as u32 + 1;
            }
            let prescribed = prescriptions
                .iter()
                .find(|p| p.exercise_id == entry.exercise_id);
            SessionExercise {
                prescription: ExercisePrescription {
                    exercise_id: entry.exercise_id.clone(),
                    name: resolve_name(&entry.exercise_id)
                        .unwrap_or_else(|| entry.exercise_name.clone()),
                    is_unilateral: entry.is_unilateral,
                    set_count: sets.len() as u32,
                    rep_min: prescribed.and_then(|p| p.rep_min),
                    rep_max: prescribed.and_then(|p| p.rep_max),
                    rest: prescribed.map(|p| p.rest).unwrap_or_default(),
                    side_rest: prescribed.map(|p| p.side_rest).unwrap_or_default(),
                    superset_id: entry.superset_id.clone(),
                    superset_order: entry.superset_order,
                },
                sets,
            }
        })
        .collect();
    WorkoutSets::new(exercises)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EffortMetric, RestDuration};
    use crate::workout::sets::tests::{prescription, unilateral};
    use crate::workout::sets::{SetField, Side};
    use chrono::Utc;

    #[test]
    fn test_start_prefills_prescribed_sets() {
        let sets = start(&[
            prescription("squat", "Squat", 3),
            unilateral("lunge", "Lunges", 2),
        ]);

        assert_eq!(sets.exercises().len(), 2);
        assert_eq!(sets.exercise("squat").unwrap().sets.len(), 3);
        assert_eq!(sets.exercise("lunge").unwrap().sets.len(), 2);
        assert!(sets
            .exercises()
            .iter()
            .flat_map(|e| e.sets.iter())
            .all(|s| !s.has_data() && !s.completed_left && !s.completed_right));
    }

    #[test]
    fn test_finish_with_only_empty_sets_has_nothing_to_save() {
        let mut sets = start(&[prescription("squat", "Squat", 3)]);
        // Completion and notes alone are not data
        sets.complete_side("squat", 1, Side::Both, true);
        sets.set_field("squat", 2, SetField::Note, "skipped");
        sets.set_field("squat", 3, SetField::Weight, "heavy");

        assert!(matches!(finish(&sets), Err(AppError::NoDataToSave)));
    }

    #[test]
    fn test_finish_drops_empty_sets_and_exercises() {
        let mut sets = start(&[
            prescription("squat", "Squat", 3),
            prescription("bench", "Bench Press", 2),
        ]);
        sets.set_field("squat", 2, SetField::Weight, "100");
        sets.set_field("squat", 2, SetField::Reps, "5");
        sets.set_field("squat", 2, SetField::Effort, "2");
        sets.set_field("squat", 2, SetField::Note, "  belt  ");
        sets.mark_pr("squat", 2, true);
        sets.complete_side("squat", 2, Side::Both, true);

        let exercises = finish(&sets).unwrap();

        assert_eq!(exercises.len(), 1);
        let squat = &exercises[0];
        assert_eq!(squat.exercise_name, "Squat");
        assert_eq!(squat.sets.len(), 1);
        let set = &squat.sets[0];
        assert_eq!(set.set_number, 2);
        assert_eq!(set.weight, Some(100.0));
        assert_eq!(set.reps, Some(5));
        assert_eq!(set.effort, Some(2.0));
        assert_eq!(set.note.as_deref(), Some("belt"));
        assert!(set.is_pr);
        assert!(set.completed);
        assert!(set.completed_left);
        assert!(!set.completed_right);
    }

    #[test]
    fn test_finish_keeps_reps_only_sets() {
        let mut sets = start(&[prescription("pullup", "Pull-up", 1)]);
        sets.set_field("pullup", 1, SetField::Reps, "12");

        let exercises = finish(&sets).unwrap();

        assert_eq!(exercises[0].sets[0].weight, None);
        assert_eq!(exercises[0].sets[0].reps, Some(12));
    }

    #[test]
    fn test_finish_unilateral_completed_mirrors_left() {
        let mut sets = start(&[unilateral("lunge", "Lunges", 1)]);
        sets.set_field("lunge", 1, SetField::Reps, "10");
        sets.complete_side("lunge", 1, Side::Right, true);

        let exercises = finish(&sets).unwrap();
        let set = &exercises[0].sets[0];

        assert!(!set.completed);
        assert!(set.completed_right);
    }

    #[test]
    fn test_load_for_edit_restores_sets_and_resolves_names() {
        let mut sets = start(&[
            prescription("squat", "Squat", 3),
            unilateral("lunge", "Lunges", 1),
        ]);
        sets.set_field("squat", 1, SetField::Weight, "102.5");
        sets.set_field("squat", 1, SetField::Reps, "5");
        sets.set_field("squat", 3, SetField::Weight, "90");
        sets.set_field("squat", 3, SetField::Reps, "8");
        sets.set_field("lunge", 1, SetField::Reps, "10");
        sets.complete_side("lunge", 1, Side::Left, true);
        let session = WorkoutSession {
            id: "s1".to_string(),
            user_id: "user1".to_string(),
            routine_id: Some("r1".to_string()),
            routine_name: "Legs".to_string(),
            completed_at: Utc::now(),
            duration_secs: 1800,
            effort_metric: EffortMetric::Rpe,
            exercises: finish(&sets).unwrap(),
        };

        let restored = load_for_edit(&session, &[], |id| {
            (id == "squat").then(|| "Back Squat".to_string())
        });

        let squat = restored.exercise("squat").unwrap();
        assert_eq!(squat.prescription.name, "Back Squat");
        assert_eq!(squat.sets.len(), 2);
        assert_eq!(squat.sets[0].weight, "102.5");
        assert_eq!(squat.sets[1].set_number, 2);
        assert_eq!(squat.sets[1].weight, "90");
        assert_eq!(squat.sets[1].reps, "8");

        let lunge = restored.exercise("lunge").unwrap();
        assert_eq!(lunge.prescription.name, "Lunges");
        assert!(lunge.is_unilateral());
        assert!(lunge.sets[0].completed_left);
        assert!(!lunge.sets[0].completed_right);
        assert_eq!(lunge.prescription.side_rest, RestDuration::default());
    }

    #[test]
    fn test_load_for_edit_takes_rest_from_routine() {
        let mut squat = prescription("squat", "Squat", 3);
        squat.rest = RestDuration::from_secs(150);
        squat.rep_min = Some(3);
        squat.rep_max = Some(5);
        let mut lunge = unilateral("lunge", "Lunges", 1);
        lunge.rest = RestDuration::from_secs(60);
        lunge.side_rest = RestDuration::from_secs(30);
        let mut sets = start(&[squat.clone(), lunge.clone()]);
        sets.set_field("squat", 1, SetField::Reps, "5");
        sets.set_field("lunge", 1, SetField::Reps, "10");
        let session = WorkoutSession {
            id: "s1".to_string(),
            user_id: "user1".to_string(),
            routine_id: Some("r1".to_string()),
            routine_name: "Legs".to_string(),
            completed_at: Utc::now(),
            duration_secs: 1800,
            effort_metric: EffortMetric::Rir,
            exercises: finish(&sets).unwrap(),
        };

        // The routine has since dropped lunges
        let restored = load_for_edit(&session, &[squat], |_| None);

        let squat = &restored.exercise("squat").unwrap().prescription;
        assert_eq!(squat.rest.total_seconds(), 150);
        assert_eq!((squat.rep_min, squat.rep_max), (Some(3), Some(5)));
        let lunge = &restored.exercise("lunge").unwrap().prescription;
        assert_eq!(lunge.rest.total_seconds(), 0);
        assert_eq!(lunge.side_rest.total_seconds(), 0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(102.5), "102.5");
    }
}
