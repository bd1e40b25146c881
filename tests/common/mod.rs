#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use liftsession::db::{create_memory_pool, DbPool};
use liftsession::handlers::workouts::WorkoutsState;
use liftsession::migrations::run_migrations_for_tests;
use liftsession::models::{EffortMetric, Exercise, ExercisePrescription, RestDuration, Routine};
use liftsession::repositories::{ExerciseRepository, RoutineRepository, WorkoutRepository};
use liftsession::workout::ActiveWorkouts;

pub fn setup_test_db() -> DbPool {
    let pool = create_memory_pool().expect("Failed to create test database");
    run_migrations_for_tests(&pool).expect("Failed to run migrations");
    pool
}

pub struct TestApp {
    pub router: Router,
    pub active: ActiveWorkouts,
}

pub fn create_test_app(pool: DbPool) -> TestApp {
    let active = ActiveWorkouts::new();
    let workouts_state = WorkoutsState {
        workout_repo: WorkoutRepository::new(pool.clone()),
        exercise_repo: ExerciseRepository::new(pool.clone()),
        routine_repo: RoutineRepository::new(pool),
        active: active.clone(),
        effort_metric: EffortMetric::Rir,
    };

    TestApp {
        router: liftsession::routes::create_router(workouts_state),
        active,
    }
}

// Test data creation helpers
pub async fn create_test_exercise(pool: &DbPool, name: &str, is_unilateral: bool) -> Exercise {
    ExerciseRepository::new(pool.clone())
        .create(name, is_unilateral)
        .await
        .unwrap()
}

pub fn prescribe(exercise: &Exercise, set_count: u32, rest_secs: u32) -> ExercisePrescription {
    ExercisePrescription {
        exercise_id: exercise.id.clone(),
        name: exercise.name.clone(),
        is_unilateral: exercise.is_unilateral,
        set_count,
        rep_min: Some(5),
        rep_max: Some(8),
        rest: RestDuration::from_secs(rest_secs),
        side_rest: RestDuration::default(),
        superset_id: None,
        superset_order: None,
    }
}

pub async fn create_test_routine(
    pool: &DbPool,
    user_id: &str,
    name: &str,
    exercises: Vec<ExercisePrescription>,
) -> Routine {
    RoutineRepository::new(pool.clone())
        .create(user_id, name, exercises)
        .await
        .unwrap()
}

pub async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn post(app: &TestApp, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

pub async fn get(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}
