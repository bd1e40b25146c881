use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

/// Which scale the effort field of a set is logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffortMetric {
    /// Reps in reserve
    #[default]
    Rir,
    /// Rate of perceived exertion
    Rpe,
}

impl EffortMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffortMetric::Rir => "rir",
            EffortMetric::Rpe => "rpe",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "rpe" => EffortMetric::Rpe,
            _ => EffortMetric::Rir,
        }
    }
}

/// One persisted set. `completed` mirrors the primary (left) flag so older
/// readers that only know a single completion flag keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    #[serde(rename = "set")]
    pub set_number: u32,
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub effort: Option<f64>,
    pub note: Option<String>,
    pub is_pr: bool,
    pub completed_left: bool,
    pub completed_right: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExerciseRecord {
    pub exercise_id: String,
    pub exercise_name: String,
    pub is_unilateral: bool,
    #[serde(default)]
    pub superset_id: Option<String>,
    #[serde(default)]
    pub superset_order: Option<u32>,
    pub sets: Vec<SetRecord>,
}

/// A finished workout as handed to the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: String,
    pub user_id: String,
    pub routine_id: Option<String>,
    pub routine_name: String,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub effort_metric: EffortMetric,
    pub exercises: Vec<SessionExerciseRecord>,
}

impl FromSqliteRow for WorkoutSession {
    /// Maps the session header only; exercise entries come from the set rows.
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let effort_metric: String = row.get("effort_metric")?;
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            routine_id: row.get("routine_id")?,
            routine_name: row.get("routine_name")?,
            completed_at: row.get("completed_at")?,
            duration_secs: row.get("duration_secs")?,
            effort_metric: EffortMetric::parse(&effort_metric),
            exercises: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkoutSession {
    pub user_id: String,
    pub routine_id: Option<String>,
    pub routine_name: String,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub effort_metric: EffortMetric,
    pub exercises: Vec<SessionExerciseRecord>,
}

impl NewWorkoutSession {
    pub fn with_id(self, id: String) -> WorkoutSession {
        WorkoutSession {
            id,
            user_id: self.user_id,
            routine_id: self.routine_id,
            routine_name: self.routine_name,
            completed_at: self.completed_at,
            duration_secs: self.duration_secs,
            effort_metric: self.effort_metric,
            exercises: self.exercises,
        }
    }
}

/// Partial update of a stored session. `None` leaves the column untouched;
/// `exercises` replaces the whole exercise list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    pub routine_name: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub exercises: Option<Vec<SessionExerciseRecord>>,
}

/// A `workout_session_sets` row: one set plus the entry it belongs to.
#[derive(Debug, Clone)]
pub struct SessionSetRow {
    pub exercise_position: u32,
    pub exercise_id: String,
    pub exercise_name: String,
    pub is_unilateral: bool,
    pub superset_id: Option<String>,
    pub superset_order: Option<u32>,
    pub set: SetRecord,
}

impl FromSqliteRow for SessionSetRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            exercise_position: row.get("exercise_position")?,
            exercise_id: row.get("exercise_id")?,
            exercise_name: row.get("exercise_name")?,
            is_unilateral: row.get("is_unilateral")?,
            superset_id: row.get("superset_id")?,
            superset_order: row.get("superset_order")?,
            set: SetRecord {
                set_number: row.get("set_number")?,
                weight: row.get("weight")?,
                reps: row.get("reps")?,
                effort: row.get("effort")?,
                note: row.get("note")?,
                is_pr: row.get("is_pr")?,
                completed_left: row.get("completed_left")?,
                completed_right: row.get("completed_right")?,
                completed: row.get("completed")?,
            },
        })
    }
}

/// Folds ordered set rows back into exercise entries.
pub fn group_set_rows(rows: Vec<SessionSetRow>) -> Vec<SessionExerciseRecord> {
    let mut exercises: Vec<(u32, SessionExerciseRecord)> = Vec::new();
    for row in rows {
        match exercises.last_mut() {
            Some((position, entry)) if *position == row.exercise_position => {
                entry.sets.push(row.set);
            }
            _ => exercises.push((
                row.exercise_position,
                SessionExerciseRecord {
                    exercise_id: row.exercise_id,
                    exercise_name: row.exercise_name,
                    is_unilateral: row.is_unilateral,
                    superset_id: row.superset_id,
                    superset_order: row.superset_order,
                    sets: vec![row.set],
                },
            )),
        }
    }
    exercises.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(position: u32, exercise_id: &str, set_number: u32) -> SessionSetRow {
        SessionSetRow {
            exercise_position: position,
            exercise_id: exercise_id.to_string(),
            exercise_name: exercise_id.to_uppercase(),
            is_unilateral: false,
            superset_id: None,
            superset_order: None,
            set: SetRecord {
                set_number,
                weight: Some(50.0),
                reps: Some(10),
                effort: None,
                note: None,
                is_pr: false,
                completed_left: true,
                completed_right: false,
                completed: true,
            },
        }
    }

    #[test]
    fn test_effort_metric_as_str() {
        assert_eq!(EffortMetric::Rir.as_str(), "rir");
        assert_eq!(EffortMetric::Rpe.as_str(), "rpe");
    }

    #[test]
    fn test_effort_metric_parse() {
        assert_eq!(EffortMetric::parse("rpe"), EffortMetric::Rpe);
        assert_eq!(EffortMetric::parse("RPE "), EffortMetric::Rpe);
        assert_eq!(EffortMetric::parse("rir"), EffortMetric::Rir);
        assert_eq!(EffortMetric::parse("unknown"), EffortMetric::Rir);
    }

    #[test]
    fn test_set_record_serializes_set_number_as_set() {
        let json = serde_json::to_value(row(0, "squat", 2).set).unwrap();
        assert_eq!(json["set"], 2);
        assert!(json.get("set_number").is_none());
    }

    #[test]
    fn test_group_set_rows_keeps_entry_order() {
        let grouped = group_set_rows(vec![
            row(0, "squat", 1),
            row(0, "squat", 2),
            row(1, "bench", 1),
            row(2, "squat", 1),
        ]);

        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0].exercise_id, "squat");
        assert_eq!(grouped[0].sets.len(), 2);
        assert_eq!(grouped[1].exercise_id, "bench");
        assert_eq!(grouped[2].exercise_id, "squat");
        assert_eq!(grouped[2].sets.len(), 1);
    }
}
