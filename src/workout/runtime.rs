//! Live workouts: the shared session state plus the timers that drive it.
//!
//! Timer tasks only hold a `Weak` reference to the state. The handle owns
//! their `JoinHandle`s and is the only place that cancels them.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};

use super::clock::{Ticker, TICK_PERIOD};
use super::session::{ActiveWorkout, FinishedWorkout, WorkoutSnapshot};

struct RuntimeState {
    workout: ActiveWorkout,
    clock_ticker: Option<Ticker>,
    rest_ticker: Option<Ticker>,
    /// Set while a finished record is being saved.
    finishing: bool,
}

/// Which of a workout's timers are still ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerStatus {
    pub clock: bool,
    pub rest: bool,
}

#[derive(Clone)]
pub struct WorkoutHandle {
    state: Arc<Mutex<RuntimeState>>,
}

impl WorkoutHandle {
    /// Takes ownership of a workout and starts its session clock.
    pub async fn launch(workout: ActiveWorkout) -> Self {
        let handle = Self {
            state: Arc::new(Mutex::new(RuntimeState {
                workout,
                clock_ticker: None,
                rest_ticker: None,
                finishing: false,
            })),
        };
        let clock = Self::spawn_clock(Arc::downgrade(&handle.state));
        handle.state.lock().await.clock_ticker = Some(clock);
        handle
    }

    fn spawn_clock(state: Weak<Mutex<RuntimeState>>) -> Ticker {
        Ticker::spawn(TICK_PERIOD, move || {
            let state = state.clone();
            async move {
                let Some(state) = state.upgrade() else {
                    return false;
                };
                let mut guard = state.lock().await;
                guard.workout.tick_clock(Utc::now());
                drop(guard);
                true
            }
        })
    }

    fn spawn_rest(state: Weak<Mutex<RuntimeState>>) -> Ticker {
        Ticker::spawn(TICK_PERIOD, move || {
            let state = state.clone();
            async move {
                let Some(state) = state.upgrade() else {
                    return false;
                };
                let mut guard = state.lock().await;
                let running = guard.workout.tick_rest();
                drop(guard);
                running
            }
        })
    }

    /// Runs one event against the workout and returns its result together
    /// with the state it left behind. A rest started by the event gets a fresh
    /// countdown; a rest that ended stops its countdown.
    pub async fn apply<R, F>(&self, event: F) -> (R, WorkoutSnapshot)
    where
        F: FnOnce(&mut ActiveWorkout) -> R,
    {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let generation = state.workout.rest().generation();

        let result = event(&mut state.workout);

        if state.workout.rest().generation() != generation {
            if let Some(mut previous) = state.rest_ticker.take() {
                previous.stop();
            }
            state.rest_ticker = Some(Self::spawn_rest(Arc::downgrade(&self.state)));
        } else if !state.workout.rest().is_active() {
            if let Some(mut ticker) = state.rest_ticker.take() {
                ticker.stop();
            }
        }

        let snapshot = state.workout.snapshot();
        (result, snapshot)
    }

    pub async fn snapshot(&self) -> WorkoutSnapshot {
        self.state.lock().await.workout.snapshot()
    }

    /// Assembles the session record and marks the workout as being saved.
    /// Only one save can be in flight; the caller settles it with
    /// [`stop`](Self::stop) on success or [`abort_finish`](Self::abort_finish)
    /// on failure. Timers keep running so a failed save can be retried.
    pub async fn finish(&self) -> Result<FinishedWorkout> {
        let mut guard = self.state.lock().await;
        if guard.finishing {
            return Err(AppError::Conflict(
                "This workout is already being saved".to_string(),
            ));
        }
        let finished = guard.workout.finish(Utc::now())?;
        guard.finishing = true;
        Ok(finished)
    }

    /// Reopens the workout after a failed save.
    pub async fn abort_finish(&self) {
        self.state.lock().await.finishing = false;
    }

    /// Whether both handles drive the same workout.
    pub fn same_workout(&self, other: &WorkoutHandle) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Cancels both timers and freezes the session clock.
    pub async fn stop(&self) {
        let mut guard = self.state.lock().await;
        guard.workout.stop_clock(Utc::now());
        if let Some(mut ticker) = guard.clock_ticker.take() {
            ticker.stop();
        }
        if let Some(mut ticker) = guard.rest_ticker.take() {
            ticker.stop();
        }
        tracing::debug!(user_id = guard.workout.user_id(), "Workout timers stopped");
    }

    pub async fn timer_status(&self) -> TimerStatus {
        let guard = self.state.lock().await;
        TimerStatus {
            clock: guard.clock_ticker.as_ref().is_some_and(Ticker::is_running),
            rest: guard.rest_ticker.as_ref().is_some_and(Ticker::is_running),
        }
    }
}

/// At most one live workout per user.
#[derive(Clone, Default)]
pub struct ActiveWorkouts {
    workouts: Arc<Mutex<HashMap<String, WorkoutHandle>>>,
}

impl ActiveWorkouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str) -> Option<WorkoutHandle> {
        self.workouts.lock().await.get(user_id).cloned()
    }

    /// Launches a workout for its user, tearing down the one it replaces.
    pub async fn launch(&self, workout: ActiveWorkout) -> WorkoutHandle {
        let user_id = workout.user_id().to_string();
        let handle = WorkoutHandle::launch(workout).await;
        let previous = self
            .workouts
            .lock()
            .await
            .insert(user_id.clone(), handle.clone());
        if let Some(previous) = previous {
            tracing::info!(user_id = %user_id, "Discarding previous active workout");
            previous.stop().await;
        }
        handle
    }

    /// Removes a user's workout and cancels its timers.
    pub async fn end(&self, user_id: &str) -> Option<WorkoutHandle> {
        let handle = self.workouts.lock().await.remove(user_id)?;
        handle.stop().await;
        Some(handle)
    }

    /// Stops `handle` and unregisters it, unless the user has since moved on
    /// to another workout. Returns whether it was still the registered one.
    pub async fn end_if(&self, user_id: &str, handle: &WorkoutHandle) -> bool {
        let removed = {
            let mut workouts = self.workouts.lock().await;
            match workouts.get(user_id) {
                Some(current) if current.same_workout(handle) => workouts.remove(user_id).is_some(),
                _ => false,
            }
        };
        handle.stop().await;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EffortMetric, ExercisePrescription, RestDuration, Routine};
    use crate::workout::rest::RestPhase;
    use crate::workout::sets::tests::{prescription, unilateral};
    use crate::workout::sets::{SetField, Side};
    use std::time::Duration;

    fn workout(user_id: &str, exercises: Vec<ExercisePrescription>) -> ActiveWorkout {
        let routine = Routine {
            id: "r1".to_string(),
            user_id: user_id.to_string(),
            name: "Push".to_string(),
            exercises,
            created_at: Utc::now(),
        };
        ActiveWorkout::start(user_id, &routine, &[], EffortMetric::Rir, Utc::now())
    }

    fn bench(rest_secs: u32) -> ExercisePrescription {
        let mut bench = prescription("bench", "Bench Press", 3);
        bench.rest = RestDuration::from_secs(rest_secs);
        bench
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_starts_clock_only() {
        let handle = WorkoutHandle::launch(workout("user1", vec![bench(90)])).await;

        assert_eq!(
            handle.timer_status().await,
            TimerStatus {
                clock: true,
                rest: false
            }
        );
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rest_counts_down_and_expires() {
        let handle = WorkoutHandle::launch(workout("user1", vec![bench(3)])).await;

        let (phase, snapshot) = handle
            .apply(|w| w.complete_side("bench", 1, Side::Both, true))
            .await;
        assert_eq!(phase, RestPhase::RestingBetweenSets);
        assert_eq!(snapshot.rest.remaining_seconds, 3);
        assert!(handle.timer_status().await.rest);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.snapshot().await.rest.remaining_seconds, 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let snapshot = handle.snapshot().await;
        assert!(!snapshot.rest.is_active);
        assert_eq!(snapshot.rest_phase, RestPhase::Idle);
        assert!(!handle.timer_status().await.rest);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_rest_restarts_countdown() {
        let mut lunges = unilateral("lunge", "Lunges", 2);
        lunges.side_rest = RestDuration::from_secs(20);
        let handle = WorkoutHandle::launch(workout("user1", vec![bench(90), lunges])).await;

        handle
            .apply(|w| w.complete_side("bench", 1, Side::Both, true))
            .await;
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(handle.snapshot().await.rest.remaining_seconds, 85);

        let (_, snapshot) = handle
            .apply(|w| w.complete_side("lunge", 1, Side::Left, true))
            .await;
        assert_eq!(snapshot.rest.duration_seconds, 20);
        assert_eq!(snapshot.rest.remaining_seconds, 20);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let rest = handle.snapshot().await.rest;
        // Only one countdown is driving the rest
        assert_eq!(rest.remaining_seconds, 18);
        assert!(rest.remaining_seconds <= rest.duration_seconds);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_stops_rest_countdown() {
        let handle = WorkoutHandle::launch(workout("user1", vec![bench(60)])).await;
        handle
            .apply(|w| w.complete_side("bench", 1, Side::Both, true))
            .await;

        let (_, snapshot) = handle.apply(|w| w.dismiss_rest()).await;

        assert!(!snapshot.rest.is_active);
        assert!(!handle.timer_status().await.rest);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_both_timers() {
        let handle = WorkoutHandle::launch(workout("user1", vec![bench(60)])).await;
        handle
            .apply(|w| w.complete_side("bench", 1, Side::Both, true))
            .await;
        tokio::time::sleep(Duration::from_millis(2500)).await;

        handle.stop().await;
        let frozen = handle.snapshot().await.rest.remaining_seconds;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(
            handle.timer_status().await,
            TimerStatus {
                clock: false,
                rest: false
            }
        );
        assert_eq!(frozen, 58);
        assert_eq!(handle.snapshot().await.rest.remaining_seconds, frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_all_handles_ends_timer_tasks() {
        let handle = WorkoutHandle::launch(workout("user1", vec![bench(60)])).await;
        handle
            .apply(|w| w.complete_side("bench", 1, Side::Both, true))
            .await;
        let weak = Arc::downgrade(&handle.state);

        drop(handle);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(weak.upgrade().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_replaces_and_ends_workouts() {
        let registry = ActiveWorkouts::new();
        let first = registry.launch(workout("user1", vec![bench(60)])).await;
        first
            .apply(|w| w.complete_side("bench", 1, Side::Both, true))
            .await;

        let second = registry.launch(workout("user1", vec![bench(60)])).await;

        assert_eq!(
            first.timer_status().await,
            TimerStatus {
                clock: false,
                rest: false
            }
        );
        assert!(second.timer_status().await.clock);
        assert!(registry.get("user2").await.is_none());

        let ended = registry.end("user1").await.unwrap();
        assert!(!ended.timer_status().await.clock);
        assert!(registry.get("user1").await.is_none());
        assert!(registry.end("user1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_elapsed_time() {
        let handle = WorkoutHandle::launch(workout("user1", vec![bench(60)])).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        handle.stop().await;
        let frozen = handle.snapshot().await.elapsed_secs;
        handle.apply(|w| w.tick_clock(Utc::now() + chrono::Duration::minutes(5))).await;

        assert_eq!(handle.snapshot().await.elapsed_secs, frozen);
        assert!(!handle.timer_status().await.clock);
    }

    fn logged_workout(user_id: &str) -> ActiveWorkout {
        let mut workout = workout(user_id, vec![bench(60)]);
        workout.set_field("bench", 1, SetField::Weight, "80");
        workout.set_field("bench", 1, SetField::Reps, "8");
        workout
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_finish_is_rejected_until_first_settles() {
        let handle = WorkoutHandle::launch(logged_workout("user1")).await;

        assert!(handle.finish().await.is_ok());
        assert!(matches!(
            handle.finish().await,
            Err(crate::error::AppError::Conflict(_))
        ));

        handle.abort_finish().await;
        assert!(handle.finish().await.is_ok());
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_finishing_workout_does_not_end_its_replacement() {
        let registry = ActiveWorkouts::new();
        let finishing = registry.launch(logged_workout("user1")).await;
        finishing.finish().await.unwrap();

        // A new workout starts while the old one is still being saved
        let replacement = registry.launch(workout("user1", vec![bench(60)])).await;
        let ended = registry.end_if("user1", &finishing).await;

        assert!(!ended);
        let current = registry.get("user1").await.unwrap();
        assert!(current.same_workout(&replacement));
        assert!(current.timer_status().await.clock);
        assert!(!finishing.timer_status().await.clock);

        assert!(registry.end_if("user1", &replacement).await);
        assert!(registry.get("user1").await.is_none());
        assert!(!replacement.timer_status().await.clock);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_finish_keeps_timers_running() {
        let handle = WorkoutHandle::launch(workout("user1", vec![bench(60)])).await;
        assert!(handle.finish().await.is_err());
        assert!(handle.timer_status().await.clock);

        handle
            .apply(|w| {
                w.set_field("bench", 1, SetField::Weight, "80");
                w.set_field("bench", 1, SetField::Reps, "8")
            })
            .await;
        let finished = handle.finish().await.unwrap();
        assert_eq!(finished.session.exercises.len(), 1);
        handle.stop().await;
    }
}
