use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cmetrack_core::goals::{GoalBatchRunner, GoalService};
use cmetrack_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, CreditLedgerRepository,
    GoalCatalogRepository, LicenseRepository, ProfileRepository, UserGoalRepository,
};

use crate::config::{Config, LogFormat};

pub struct AppState {
    pub goal_service: Arc<GoalService>,
    pub batch_runner: GoalBatchRunner,
}

/// Installs the global subscriber. `log` records from the library crates are
/// forwarded to it.
pub fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = create_pool(&db_path)?;
    run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());

    let catalog = Arc::new(GoalCatalogRepository::new(pool.clone(), writer.clone()));
    let user_goals = Arc::new(UserGoalRepository::new(pool.clone(), writer.clone()));
    let profiles = Arc::new(ProfileRepository::new(pool.clone(), writer.clone()));
    let licenses = Arc::new(LicenseRepository::new(pool.clone()));
    let ledger = Arc::new(CreditLedgerRepository::new(pool.clone(), writer));

    let goal_service = Arc::new(GoalService::new(
        catalog,
        user_goals.clone(),
        profiles.clone(),
        licenses,
        ledger,
    ));
    let batch_runner = GoalBatchRunner::new(
        goal_service.clone(),
        user_goals,
        profiles,
        config.concurrency,
    );

    Ok(Arc::new(AppState {
        goal_service,
        batch_runner,
    }))
}
