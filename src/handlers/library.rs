use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Exercise, Routine};

use super::workouts::{prescribe, PrescribeExercise, WorkoutsState};

#[derive(Deserialize)]
pub struct CreateExercise {
    pub name: String,
    #[serde(default)]
    pub is_unilateral: bool,
}

#[derive(Deserialize)]
pub struct RenameExercise {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateRoutine {
    pub name: String,
    pub exercises: Vec<PrescribeExercise>,
}

fn required_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest(format!("{} name is required", what)));
    }
    Ok(name.to_string())
}

pub async fn create_exercise(
    State(state): State<WorkoutsState>,
    Json(req): Json<CreateExercise>,
) -> Result<(StatusCode, Json<Exercise>)> {
    let name = required_name(&req.name, "Exercise")?;
    let exercise = state
        .exercise_repo
        .create(&name, req.is_unilateral)
        .await?;

    tracing::info!(exercise_id = %exercise.id, "Exercise created");
    Ok((StatusCode::CREATED, Json(exercise)))
}

/// Renames a library entry. Stored sessions pick up the new name the next
/// time they are opened for editing.
pub async fn rename_exercise(
    State(state): State<WorkoutsState>,
    Path(exercise_id): Path<String>,
    Json(req): Json<RenameExercise>,
) -> Result<Json<Exercise>> {
    let name = required_name(&req.name, "Exercise")?;
    if !state.exercise_repo.rename(&exercise_id, &name).await? {
        return Err(AppError::NotFound("Exercise not found".to_string()));
    }
    let exercise = state
        .exercise_repo
        .find_by_id(&exercise_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exercise not found".to_string()))?;

    tracing::info!(exercise_id = %exercise_id, "Exercise renamed");
    Ok(Json(exercise))
}

pub async fn create_routine(
    State(state): State<WorkoutsState>,
    Path(user_id): Path<String>,
    Json(req): Json<CreateRoutine>,
) -> Result<(StatusCode, Json<Routine>)> {
    let name = required_name(&req.name, "Routine")?;
    let mut prescriptions = Vec::with_capacity(req.exercises.len());
    for exercise in req.exercises {
        prescriptions.push(prescribe(&state, exercise).await?);
    }
    let routine = state
        .routine_repo
        .create(&user_id, &name, prescriptions)
        .await?;

    tracing::info!(user_id = %user_id, routine_id = %routine.id, "Routine created");
    Ok((StatusCode::CREATED, Json(routine)))
}

pub async fn show_routine(
    State(state): State<WorkoutsState>,
    Path((user_id, routine_id)): Path<(String, String)>,
) -> Result<Json<Routine>> {
    let routine = state
        .routine_repo
        .find_by_id(&routine_id)
        .await?
        .filter(|r| r.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("Routine not found".to_string()))?;
    Ok(Json(routine))
}
