use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, library, sessions, workouts};

pub fn create_router(workouts_state: workouts::WorkoutsState) -> Router {
    Router::new()
        // Active workout
        .route(
            "/users/{user_id}/workout",
            get(workouts::show).post(workouts::start),
        )
        .route(
            "/users/{user_id}/workout/exercises",
            post(workouts::add_exercise),
        )
        .route(
            "/users/{user_id}/workout/exercises/{exercise_id}/replace",
            post(workouts::replace_exercise),
        )
        .route(
            "/users/{user_id}/workout/exercises/{exercise_id}/remove",
            post(workouts::remove_exercise),
        )
        .route(
            "/users/{user_id}/workout/exercises/{exercise_id}/sets",
            post(workouts::add_set),
        )
        .route(
            "/users/{user_id}/workout/exercises/{exercise_id}/sets/{set_number}",
            post(workouts::set_field),
        )
        .route(
            "/users/{user_id}/workout/exercises/{exercise_id}/sets/{set_number}/complete",
            post(workouts::complete_side),
        )
        .route(
            "/users/{user_id}/workout/exercises/{exercise_id}/remove-set",
            post(workouts::remove_set),
        )
        .route(
            "/users/{user_id}/workout/exercises/{exercise_id}/restore-set",
            post(workouts::restore_set),
        )
        .route(
            "/users/{user_id}/workout/rest/dismiss",
            post(workouts::dismiss_rest),
        )
        .route("/users/{user_id}/workout/finish", post(workouts::finish))
        .route("/users/{user_id}/workout/cancel", post(workouts::cancel))
        // Stored sessions
        .route("/users/{user_id}/sessions", get(sessions::list))
        .route(
            "/users/{user_id}/sessions/restore",
            post(sessions::restore),
        )
        .route(
            "/users/{user_id}/sessions/{session_id}/edit",
            post(sessions::edit),
        )
        .route(
            "/users/{user_id}/sessions/{session_id}/delete",
            post(sessions::delete),
        )
        // Exercise library and routines
        .route("/exercises", post(library::create_exercise))
        .route(
            "/exercises/{exercise_id}/rename",
            post(library::rename_exercise),
        )
        .route("/users/{user_id}/routines", post(library::create_routine))
        .route(
            "/users/{user_id}/routines/{routine_id}",
            get(library::show_routine),
        )
        .with_state(workouts_state)
        // Health check
        .route("/health", get(health::health_check))
}
