use chrono::Utc;
use rusqlite::{OptionalExtension, Transaction};
use uuid::Uuid;

use crate::db::{DbConnection, DbPool};
use crate::error::{AppError, Result};
use crate::models::workout_session::{group_set_rows, SessionSetRow};
use crate::models::{
    FromSqliteRow, NewWorkoutSession, SessionExerciseRecord, SessionPatch, WorkoutSession,
};

/// Session store and historical sessions feed.
#[derive(Clone)]
pub struct WorkoutRepository {
    pool: DbPool,
}

fn insert_exercises(
    tx: &Transaction,
    session_id: &str,
    exercises: &[SessionExerciseRecord],
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO workout_session_sets
            (session_id, exercise_position, exercise_id, exercise_name, is_unilateral,
             superset_id, superset_order, set_number, weight, reps, effort, note,
             is_pr, completed_left, completed_right, completed)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for (position, exercise) in exercises.iter().enumerate() {
        for set in &exercise.sets {
            stmt.execute(rusqlite::params![
                session_id,
                position as i64,
                exercise.exercise_id,
                exercise.exercise_name,
                exercise.is_unilateral,
                exercise.superset_id,
                exercise.superset_order,
                set.set_number,
                set.weight,
                set.reps,
                set.effort,
                set.note,
                set.is_pr,
                set.completed_left,
                set.completed_right,
                set.completed
            ])?;
        }
    }
    Ok(())
}

fn insert_session(tx: &Transaction, session: &WorkoutSession) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO workout_sessions
            (id, user_id, routine_id, routine_name, completed_at, duration_secs,
             effort_metric, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            session.id,
            session.user_id,
            session.routine_id,
            session.routine_name,
            session.completed_at,
            session.duration_secs,
            session.effort_metric.as_str(),
            Utc::now()
        ],
    )?;
    insert_exercises(tx, &session.id, &session.exercises)
}

fn load_exercises(
    conn: &DbConnection,
    session_id: &str,
) -> rusqlite::Result<Vec<SessionExerciseRecord>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM workout_session_sets
         WHERE session_id = ?
         ORDER BY exercise_position, set_number",
    )?;
    let rows = stmt
        .query_map([session_id], SessionSetRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(group_set_rows(rows))
}

fn load_session(conn: &DbConnection, id: &str) -> rusqlite::Result<Option<WorkoutSession>> {
    let session = conn
        .prepare("SELECT * FROM workout_sessions WHERE id = ?")?
        .query_row([id], WorkoutSession::from_row)
        .optional()?;
    let Some(mut session) = session else {
        return Ok(None);
    };
    session.exercises = load_exercises(conn, &session.id)?;
    Ok(Some(session))
}

impl WorkoutRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_session(&self, new: NewWorkoutSession) -> Result<WorkoutSession> {
        let session = new.with_id(Uuid::new_v4().to_string());
        let stored = session.clone();
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            insert_session(&tx, &stored)?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        tracing::info!(session_id = %session.id, user_id = %session.user_id, "Workout session saved");
        Ok(session)
    }

    pub async fn find_session_by_id(&self, id: &str) -> Result<Option<WorkoutSession>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            Ok(load_session(&conn, &id)?)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Every stored session of a user with its sets, newest first.
    pub async fn find_sessions_by_user(&self, user_id: &str) -> Result<Vec<WorkoutSession>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM workout_sessions WHERE user_id = ? ORDER BY completed_at DESC",
            )?;
            let mut sessions = stmt
                .query_map([&user_id], WorkoutSession::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for session in &mut sessions {
                session.exercises = load_exercises(&conn, &session.id)?;
            }
            Ok(sessions)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Applies a patch to a user's session. Returns false when no such session exists.
    pub async fn update_session(
        &self,
        id: &str,
        user_id: &str,
        patch: SessionPatch,
    ) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT COUNT(*) > 0 FROM workout_sessions WHERE id = ? AND user_id = ?",
                [&id, &user_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(false);
            }

            if let Some(routine_name) = &patch.routine_name {
                tx.execute(
                    "UPDATE workout_sessions SET routine_name = ? WHERE id = ?",
                    rusqlite::params![routine_name, id],
                )?;
            }
            if let Some(completed_at) = patch.completed_at {
                tx.execute(
                    "UPDATE workout_sessions SET completed_at = ? WHERE id = ?",
                    rusqlite::params![completed_at, id],
                )?;
            }
            if let Some(duration_secs) = patch.duration_secs {
                tx.execute(
                    "UPDATE workout_sessions SET duration_secs = ? WHERE id = ?",
                    rusqlite::params![duration_secs, id],
                )?;
            }
            if let Some(exercises) = &patch.exercises {
                tx.execute(
                    "DELETE FROM workout_session_sets WHERE session_id = ?",
                    [&id],
                )?;
                insert_exercises(&tx, &id, exercises)?;
            }

            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Deletes a user's session and hands back the full record so the
    /// deletion can be undone with [`restore_session`](Self::restore_session).
    pub async fn delete_session(&self, id: &str, user_id: &str) -> Result<Option<WorkoutSession>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let session = match load_session(&conn, &id)? {
                Some(session) if session.user_id == user_id => session,
                _ => return Ok(None),
            };

            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM workout_session_sets WHERE session_id = ?",
                [&id],
            )?;
            tx.execute("DELETE FROM workout_sessions WHERE id = ?", [&id])?;
            tx.commit()?;
            Ok(Some(session))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Re-inserts a previously deleted session under its original id.
    pub async fn restore_session(&self, session: WorkoutSession) -> Result<WorkoutSession> {
        let pool = self.pool.clone();
        let stored = session.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            insert_session(&tx, &stored)?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        tracing::info!(session_id = %session.id, "Workout session restored");
        Ok(session)
    }
}
