pub mod exercise;
pub mod from_row;
pub mod routine;
pub mod workout_session;

pub use exercise::Exercise;
pub use from_row::FromSqliteRow;
pub use routine::{ExercisePrescription, RestDuration, Routine};
pub use workout_session::{
    EffortMetric, NewWorkoutSession, SessionExerciseRecord, SessionPatch, SetRecord,
    WorkoutSession,
};
