pub mod health;
pub mod library;
pub mod sessions;
pub mod workouts;
