use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{ExercisePrescription, FromSqliteRow, Routine};

#[derive(Clone)]
pub struct RoutineRepository {
    pool: DbPool,
}

impl RoutineRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Stores a routine with its prescriptions in the given order. Display
    /// names come from the exercise library, not from the prescriptions.
    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        exercises: Vec<ExercisePrescription>,
    ) -> Result<Routine> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let pool = self.pool.clone();
        let routine_id = id.clone();
        let owner = user_id.to_string();
        let routine_name = name.to_string();
        let prescriptions = exercises.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO routines (id, user_id, name, created_at) VALUES (?, ?, ?, ?)",
                rusqlite::params![routine_id, owner, routine_name, now],
            )?;
            for (position, p) in prescriptions.iter().enumerate() {
                tx.execute(
                    "INSERT INTO routine_exercises
                        (routine_id, position, exercise_id, set_count, rep_min, rep_max,
                         rest_minutes, rest_seconds, side_rest_minutes, side_rest_seconds,
                         superset_id, superset_order)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    rusqlite::params![
                        routine_id,
                        position as i64,
                        p.exercise_id,
                        p.set_count,
                        p.rep_min,
                        p.rep_max,
                        p.rest.minutes,
                        p.rest.seconds,
                        p.side_rest.minutes,
                        p.side_rest.seconds,
                        p.superset_id,
                        p.superset_order
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(Routine {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            exercises,
            created_at: now,
        })
    }

    /// Loads a routine and its ordered prescriptions.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Routine>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let routine = conn
                .prepare("SELECT * FROM routines WHERE id = ?")?
                .query_row([&id], Routine::from_row)
                .optional()?;
            let Some(mut routine) = routine else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT re.*, e.name AS exercise_name, e.is_unilateral
                 FROM routine_exercises re
                 JOIN exercises e ON re.exercise_id = e.id
                 WHERE re.routine_id = ?
                 ORDER BY re.position",
            )?;
            routine.exercises = stmt
                .query_map([&id], ExercisePrescription::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Some(routine))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::migrations::run_migrations_for_tests;
    use crate::models::RestDuration;
    use crate::repositories::ExerciseRepository;

    fn setup_test_db() -> DbPool {
        let pool = create_memory_pool().expect("Failed to create test database");
        run_migrations_for_tests(&pool).expect("Failed to run migrations");
        pool
    }

    fn prescribe(exercise_id: &str, sets: u32) -> ExercisePrescription {
        ExercisePrescription {
            exercise_id: exercise_id.to_string(),
            name: String::new(),
            is_unilateral: false,
            set_count: sets,
            rep_min: Some(6),
            rep_max: Some(10),
            rest: RestDuration::new(2, 0),
            side_rest: RestDuration::default(),
            superset_id: None,
            superset_order: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_routine() {
        let pool = setup_test_db();
        let exercises = ExerciseRepository::new(pool.clone());
        let squat = exercises.create("Squat", false).await.unwrap();
        let lunge = exercises.create("Lunges", true).await.unwrap();
        let repo = RoutineRepository::new(pool);

        let mut lunges = prescribe(&lunge.id, 2);
        lunges.side_rest = RestDuration::new(0, 20);
        lunges.superset_id = Some("finisher".to_string());
        lunges.superset_order = Some(1);
        let created = repo
            .create("user1", "Legs", vec![prescribe(&squat.id, 4), lunges])
            .await
            .unwrap();

        let found = repo.find_by_id(&created.id).await.unwrap().unwrap();

        assert_eq!(found.name, "Legs");
        assert_eq!(found.user_id, "user1");
        assert_eq!(found.exercises.len(), 2);
        assert_eq!(found.exercises[0].name, "Squat");
        assert_eq!(found.exercises[0].set_count, 4);
        assert_eq!(found.exercises[0].rest.total_seconds(), 120);
        assert_eq!(found.exercises[1].name, "Lunges");
        assert!(found.exercises[1].is_unilateral);
        assert_eq!(found.exercises[1].side_rest.total_seconds(), 20);
        assert_eq!(found.exercises[1].superset(), Some("finisher"));
    }

    #[tokio::test]
    async fn test_find_missing_routine() {
        let repo = RoutineRepository::new(setup_test_db());

        assert!(repo.find_by_id("nope").await.unwrap().is_none());
    }
}
