use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::WorkoutSession;
use crate::workout::{ActiveWorkout, WorkoutSnapshot};

use super::workouts::WorkoutsState;

pub async fn list(
    State(state): State<WorkoutsState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<WorkoutSession>>> {
    let sessions = state.workout_repo.find_sessions_by_user(&user_id).await?;
    Ok(Json(sessions))
}

/// Reopens a stored session as the user's active workout.
pub async fn edit(
    State(state): State<WorkoutsState>,
    Path((user_id, session_id)): Path<(String, String)>,
) -> Result<Json<WorkoutSnapshot>> {
    let session = state
        .workout_repo
        .find_session_by_id(&session_id)
        .await?
        .filter(|s| s.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("Workout session not found".to_string()))?;
    let history = state.workout_repo.find_sessions_by_user(&user_id).await?;

    let ids: Vec<String> = session
        .exercises
        .iter()
        .map(|e| e.exercise_id.clone())
        .collect();
    let names = state.exercise_repo.find_names(&ids).await?;
    let prescriptions = match &session.routine_id {
        Some(routine_id) => state
            .routine_repo
            .find_by_id(routine_id)
            .await?
            .filter(|r| r.user_id == user_id)
            .map(|r| r.exercises)
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let workout = ActiveWorkout::load_for_edit(
        &session,
        &prescriptions,
        &history,
        |id| names.get(id).cloned(),
        Utc::now(),
    );
    let handle = state.active.launch(workout).await;

    tracing::info!(user_id = %user_id, session_id = %session_id, "Editing workout session");
    Ok(Json(handle.snapshot().await))
}

pub async fn delete(
    State(state): State<WorkoutsState>,
    Path((user_id, session_id)): Path<(String, String)>,
) -> Result<Json<WorkoutSession>> {
    let deleted = state
        .workout_repo
        .delete_session(&session_id, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Workout session not found".to_string()))?;

    tracing::info!(user_id = %user_id, session_id = %session_id, "Workout session deleted");
    state.refresh_active_history(&user_id).await?;
    Ok(Json(deleted))
}

/// Undoes a deletion with the record the delete call returned.
pub async fn restore(
    State(state): State<WorkoutsState>,
    Path(user_id): Path<String>,
    Json(session): Json<WorkoutSession>,
) -> Result<Json<WorkoutSession>> {
    if session.user_id != user_id {
        return Err(AppError::BadRequest(
            "Session belongs to another user".to_string(),
        ));
    }
    let restored = state.workout_repo.restore_session(session).await?;

    state.refresh_active_history(&user_id).await?;
    Ok(Json(restored))
}
