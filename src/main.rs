use ballot_box::{
    api::{self, AppState},
    config::{
        AppConfig,
        database::{create_connection, create_tables},
        seed::{apply_seed, load_seed},
    },
    core::event,
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Non-fatal, variables can be set externally
    dotenv().ok();

    let config = AppConfig::from_env()
        .inspect_err(|e| error!("Critical error loading application configuration: {e}"))?;

    let db = create_connection(&config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    create_tables(&db).await?;
    let state = event::get_event_state(&db).await?;
    info!(stage = %state.state, "Database initialized");

    if let Some(seed) = load_seed(&config.seed_file)? {
        apply_seed(&db, &seed).await?;
    }

    api::serve(AppState::new(db, config)).await
}
