//! The active workout session runtime: set tracking, personal records, rest
//! periods and the clocks that drive them.

pub mod assembler;
pub mod clock;
pub mod records;
pub mod rest;
pub mod runtime;
pub mod session;
pub mod sets;

pub use records::{LastPerformance, PreviousSet, RecordBook};
pub use rest::{RestController, RestPhase, RestTimer};
pub use runtime::{ActiveWorkouts, TimerStatus, WorkoutHandle};
pub use session::{ActiveWorkout, FinishedWorkout, WorkoutSnapshot};
pub use sets::{RemovedSet, SetEntry, SetField, Side, WorkoutSets};
