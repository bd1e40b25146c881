pub mod exercise_repo;
pub mod routine_repo;
pub mod workout_repo;

pub use exercise_repo::ExerciseRepository;
pub use routine_repo::RoutineRepository;
pub use workout_repo::WorkoutRepository;
