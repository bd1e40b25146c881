use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

/// A rest period as entered in the routine editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestDuration {
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
}

impl RestDuration {
    pub fn new(minutes: u32, seconds: u32) -> Self {
        Self { minutes, seconds }
    }

    pub fn from_secs(total: u32) -> Self {
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }

    /// Saturates instead of wrapping on absurd inputs.
    pub fn total_seconds(&self) -> u32 {
        self.minutes.saturating_mul(60).saturating_add(self.seconds)
    }
}

/// How a routine prescribes one exercise. Read-only while a session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExercisePrescription {
    pub exercise_id: String,
    pub name: String,
    #[serde(default)]
    pub is_unilateral: bool,
    pub set_count: u32,
    #[serde(default)]
    pub rep_min: Option<u32>,
    #[serde(default)]
    pub rep_max: Option<u32>,
    #[serde(default)]
    pub rest: RestDuration,
    #[serde(default)]
    pub side_rest: RestDuration,
    #[serde(default)]
    pub superset_id: Option<String>,
    #[serde(default)]
    pub superset_order: Option<u32>,
}

impl ExercisePrescription {
    /// Superset id, with blank ids treated as "not in a superset".
    pub fn superset(&self) -> Option<&str> {
        self.superset_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

impl FromSqliteRow for ExercisePrescription {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            exercise_id: row.get("exercise_id")?,
            name: row.get("exercise_name")?,
            is_unilateral: row.get("is_unilateral")?,
            set_count: row.get("set_count")?,
            rep_min: row.get("rep_min")?,
            rep_max: row.get("rep_max")?,
            rest: RestDuration::new(row.get("rest_minutes")?, row.get("rest_seconds")?),
            side_rest: RestDuration::new(
                row.get("side_rest_minutes")?,
                row.get("side_rest_seconds")?,
            ),
            superset_id: row.get("superset_id")?,
            superset_order: row.get("superset_order")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routine {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub exercises: Vec<ExercisePrescription>,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for Routine {
    /// Maps the routine header only; prescriptions are loaded separately.
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            exercises: Vec::new(),
            created_at: row.get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_duration_total_seconds() {
        assert_eq!(RestDuration::new(1, 30).total_seconds(), 90);
        assert_eq!(RestDuration::new(0, 0).total_seconds(), 0);
    }

    #[test]
    fn test_rest_duration_saturates_on_huge_input() {
        assert_eq!(RestDuration::new(u32::MAX, 0).total_seconds(), u32::MAX);
        assert_eq!(RestDuration::new(0, u32::MAX).total_seconds(), u32::MAX);
        assert_eq!(RestDuration::new(u32::MAX / 60, 59).total_seconds(), u32::MAX);
    }

    #[test]
    fn test_rest_duration_from_secs() {
        assert_eq!(RestDuration::from_secs(135), RestDuration::new(2, 15));
        assert_eq!(RestDuration::from_secs(20), RestDuration::new(0, 20));
    }

    #[test]
    fn test_blank_superset_id_is_no_superset() {
        let prescription = ExercisePrescription {
            exercise_id: "curl".to_string(),
            name: "Curl".to_string(),
            is_unilateral: false,
            set_count: 3,
            rep_min: None,
            rep_max: None,
            rest: RestDuration::default(),
            side_rest: RestDuration::default(),
            superset_id: Some("  ".to_string()),
            superset_order: None,
        };
        assert_eq!(prescription.superset(), None);
    }
}
