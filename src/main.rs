use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liftsession::config::Config;
use liftsession::handlers::workouts;
use liftsession::repositories::{ExerciseRepository, RoutineRepository, WorkoutRepository};
use liftsession::workout::ActiveWorkouts;
use liftsession::{db, migrations, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftsession=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing::info!("Connecting to database: {}", config.database_url);
    let pool = db::create_pool(&config.database_url)?;
    migrations::run_migrations(&pool)?;

    let workouts_state = workouts::WorkoutsState {
        workout_repo: WorkoutRepository::new(pool.clone()),
        exercise_repo: ExerciseRepository::new(pool.clone()),
        routine_repo: RoutineRepository::new(pool.clone()),
        active: ActiveWorkouts::new(),
        effort_metric: config.effort_metric,
    };

    let app = routes::create_router(workouts_state);

    let addr = config.server_addr();
    tracing::info!(version = env!("BUILD_VERSION"), "Starting server at http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
