use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{EffortMetric, ExercisePrescription, RestDuration, SessionPatch, WorkoutSession};
use crate::repositories::{ExerciseRepository, RoutineRepository, WorkoutRepository};
use crate::workout::{
    ActiveWorkout, ActiveWorkouts, FinishedWorkout, RemovedSet, SetField, Side, WorkoutHandle,
    WorkoutSnapshot,
};

/// Longest rest a prescription may ask for.
pub const MAX_REST_SECS: u32 = 60 * 60;

#[derive(Clone)]
pub struct WorkoutsState {
    pub workout_repo: WorkoutRepository,
    pub exercise_repo: ExerciseRepository,
    pub routine_repo: RoutineRepository,
    pub active: ActiveWorkouts,
    /// Used when a start request does not pick an effort scale.
    pub effort_metric: EffortMetric,
}

impl WorkoutsState {
    pub(crate) async fn active_workout(&self, user_id: &str) -> Result<WorkoutHandle> {
        self.active
            .get(user_id)
            .await
            .ok_or_else(|| AppError::NotFound("No active workout".to_string()))
    }

    /// Pushes the latest stored sessions into the user's running workout, if any.
    pub(crate) async fn refresh_active_history(&self, user_id: &str) -> Result<()> {
        let Some(handle) = self.active.get(user_id).await else {
            return Ok(());
        };
        let history = self.workout_repo.find_sessions_by_user(user_id).await?;
        handle.apply(|w| w.refresh_history(&history)).await;
        Ok(())
    }
}

// Request bodies
#[derive(Deserialize)]
pub struct StartWorkout {
    pub routine_id: String,
    pub effort_metric: Option<EffortMetric>,
}

#[derive(Deserialize)]
pub struct PrescribeExercise {
    pub exercise_id: String,
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

#[derive(Deserialize)]
pub struct UpdateSetField {
    pub field: SetField,
    pub value: String,
}

#[derive(Deserialize)]
pub struct CompleteSide {
    pub side: Side,
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct RemoveSet {
    pub set_id: String,
}

#[derive(Serialize)]
pub struct RemoveSetResponse {
    /// Send this back to `restore-set` to undo the removal.
    pub removed: Option<RemovedSet>,
    pub workout: WorkoutSnapshot,
}

/// Builds a prescription for a library exercise.
pub(crate) async fn prescribe(
    state: &WorkoutsState,
    req: PrescribeExercise,
) -> Result<ExercisePrescription> {
    if req.set_count == 0 {
        return Err(AppError::BadRequest(
            "An exercise needs at least one set".to_string(),
        ));
    }
    if req.rest.total_seconds() > MAX_REST_SECS || req.side_rest.total_seconds() > MAX_REST_SECS {
        return Err(AppError::BadRequest(
            "Rest periods are limited to 60 minutes".to_string(),
        ));
    }
    let exercise = state
        .exercise_repo
        .find_by_id(&req.exercise_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exercise not found".to_string()))?;

    Ok(ExercisePrescription {
        exercise_id: exercise.id,
        name: exercise.name,
        is_unilateral: exercise.is_unilateral,
        set_count: req.set_count,
        rep_min: req.rep_min,
        rep_max: req.rep_max,
        rest: req.rest,
        side_rest: req.side_rest,
        superset_id: req.superset_id,
        superset_order: req.superset_order,
    })
}

// Handlers
pub async fn start(
    State(state): State<WorkoutsState>,
    Path(user_id): Path<String>,
    Json(req): Json<StartWorkout>,
) -> Result<Json<WorkoutSnapshot>> {
    let routine = state
        .routine_repo
        .find_by_id(&req.routine_id)
        .await?
        .filter(|r| r.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("Routine not found".to_string()))?;
    let history = state.workout_repo.find_sessions_by_user(&user_id).await?;

    let workout = ActiveWorkout::start(
        &user_id,
        &routine,
        &history,
        req.effort_metric.unwrap_or(state.effort_metric),
        Utc::now(),
    );
    let handle = state.active.launch(workout).await;

    tracing::info!(user_id = %user_id, routine_id = %routine.id, "Workout started");
    Ok(Json(handle.snapshot().await))
}

pub async fn show(
    State(state): State<WorkoutsState>,
    Path(user_id): Path<String>,
) -> Result<Json<WorkoutSnapshot>> {
    let handle = state.active_workout(&user_id).await?;
    Ok(Json(handle.snapshot().await))
}

pub async fn add_exercise(
    State(state): State<WorkoutsState>,
    Path(user_id): Path<String>,
    Json(req): Json<PrescribeExercise>,
) -> Result<Json<WorkoutSnapshot>> {
    let handle = state.active_workout(&user_id).await?;
    let prescription = prescribe(&state, req).await?;
    let (_, snapshot) = handle.apply(|w| w.add_exercise(prescription)).await;
    Ok(Json(snapshot))
}

pub async fn replace_exercise(
    State(state): State<WorkoutsState>,
    Path((user_id, exercise_id)): Path<(String, String)>,
    Json(req): Json<PrescribeExercise>,
) -> Result<Json<WorkoutSnapshot>> {
    let handle = state.active_workout(&user_id).await?;
    let prescription = prescribe(&state, req).await?;
    let (_, snapshot) = handle
        .apply(|w| w.replace_exercise(&exercise_id, prescription))
        .await;
    Ok(Json(snapshot))
}

pub async fn remove_exercise(
    State(state): State<WorkoutsState>,
    Path((user_id, exercise_id)): Path<(String, String)>,
) -> Result<Json<WorkoutSnapshot>> {
    let handle = state.active_workout(&user_id).await?;
    let (_, snapshot) = handle.apply(|w| w.remove_exercise(&exercise_id)).await;
    Ok(Json(snapshot))
}

pub async fn add_set(
    State(state): State<WorkoutsState>,
    Path((user_id, exercise_id)): Path<(String, String)>,
) -> Result<Json<WorkoutSnapshot>> {
    let handle = state.active_workout(&user_id).await?;
    let (_, snapshot) = handle.apply(|w| w.add_set(&exercise_id)).await;
    Ok(Json(snapshot))
}

pub async fn set_field(
    State(state): State<WorkoutsState>,
    Path((user_id, exercise_id, set_number)): Path<(String, String, u32)>,
    Json(req): Json<UpdateSetField>,
) -> Result<Json<WorkoutSnapshot>> {
    let handle = state.active_workout(&user_id).await?;
    let (_, snapshot) = handle
        .apply(|w| w.set_field(&exercise_id, set_number, req.field, &req.value))
        .await;
    Ok(Json(snapshot))
}

pub async fn complete_side(
    State(state): State<WorkoutsState>,
    Path((user_id, exercise_id, set_number)): Path<(String, String, u32)>,
    Json(req): Json<CompleteSide>,
) -> Result<Json<WorkoutSnapshot>> {
    let handle = state.active_workout(&user_id).await?;
    let (_, snapshot) = handle
        .apply(|w| w.complete_side(&exercise_id, set_number, req.side, req.completed))
        .await;
    Ok(Json(snapshot))
}

pub async fn remove_set(
    State(state): State<WorkoutsState>,
    Path((user_id, exercise_id)): Path<(String, String)>,
    Json(req): Json<RemoveSet>,
) -> Result<Json<RemoveSetResponse>> {
    let handle = state.active_workout(&user_id).await?;
    let (removed, workout) = handle
        .apply(|w| w.remove_set(&exercise_id, &req.set_id))
        .await;
    Ok(Json(RemoveSetResponse { removed, workout }))
}

pub async fn restore_set(
    State(state): State<WorkoutsState>,
    Path((user_id, exercise_id)): Path<(String, String)>,
    Json(removed): Json<RemovedSet>,
) -> Result<Json<WorkoutSnapshot>> {
    let handle = state.active_workout(&user_id).await?;
    let (_, snapshot) = handle
        .apply(|w| w.restore_set(&exercise_id, removed))
        .await;
    Ok(Json(snapshot))
}

pub async fn dismiss_rest(
    State(state): State<WorkoutsState>,
    Path(user_id): Path<String>,
) -> Result<Json<WorkoutSnapshot>> {
    let handle = state.active_workout(&user_id).await?;
    let (_, snapshot) = handle.apply(|w| w.dismiss_rest()).await;
    Ok(Json(snapshot))
}

/// Persists the workout and tears it down. On any failure the workout stays
/// active so the save can be retried.
pub async fn finish(
    State(state): State<WorkoutsState>,
    Path(user_id): Path<String>,
) -> Result<Json<WorkoutSession>> {
    let handle = state.active_workout(&user_id).await?;
    let finished = handle.finish().await?;

    let session = match save_finished(&state, &user_id, finished).await {
        Ok(session) => session,
        Err(e) => {
            handle.abort_finish().await;
            return Err(e);
        }
    };

    if !state.active.end_if(&user_id, &handle).await {
        tracing::debug!(user_id = %user_id, "Workout was replaced while saving");
    }
    tracing::info!(user_id = %user_id, session_id = %session.id, "Workout finished");
    Ok(Json(session))
}

async fn save_finished(
    state: &WorkoutsState,
    user_id: &str,
    finished: FinishedWorkout,
) -> Result<WorkoutSession> {
    let Some(session_id) = finished.editing else {
        return state.workout_repo.create_session(finished.session).await;
    };

    let patch = SessionPatch {
        routine_name: Some(finished.session.routine_name.clone()),
        completed_at: Some(finished.session.completed_at),
        duration_secs: Some(finished.session.duration_secs),
        exercises: Some(finished.session.exercises.clone()),
    };
    let updated = state
        .workout_repo
        .update_session(&session_id, user_id, patch)
        .await?;
    if !updated {
        return Err(AppError::NotFound("Workout session not found".to_string()));
    }
    tracing::info!(session_id = %session_id, "Workout session updated");
    Ok(finished.session.with_id(session_id))
}

pub async fn cancel(
    State(state): State<WorkoutsState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode> {
    state
        .active
        .end(&user_id)
        .await
        .ok_or_else(|| AppError::NotFound("No active workout".to_string()))?;

    tracing::info!(user_id = %user_id, "Workout cancelled");
    Ok(StatusCode::NO_CONTENT)
}
